//! The four layout engines: `stack` (shared by TILE and BSTACK), `grid`,
//! and `monocle`. Each is a pure function of (client list, work area,
//! master size, growth, border width) that returns the geometry to apply to
//! every tileable window — no X calls happen here, which is what lets
//! `tile()` be unit tested without a display connection.
//!
//! Ported from monsterwm's `stack()`/`grid()`/`monocle()` (see
//! `examples/original_source/monsterwm.c`), keeping the same growth-pixel
//! redistribution arithmetic: the first stack client absorbs the `d`
//! remainder in its own size, the cursor advances past it by `ch + d`
//! (not its border-shrunk size), and every later stack client is sized
//! `ch` with a plain `z` advance.

use crate::client::ClientStore;
use crate::desktop::Mode;
use crate::display::WindowId;
use crate::geometry::Rect;
use crate::monitor::Monitor;

/// One window's target geometry, as produced by a layout engine.
pub type Placement = (WindowId, Rect);

/// `monocle(hh, cy)`: every tileable client fills the working area.
pub fn monocle(store: &ClientStore, work: Rect, hh: i32, cy: i32) -> Vec<Placement> {
    store
        .iter()
        .filter(|c| !c.is_isfft())
        .map(|c| (c.win, Rect::new(0, cy, work.w, hh.max(0) as u32)))
        .collect()
}

/// `stack(hh, cy)`, shared by TILE (`bstack = false`) and BSTACK
/// (`bstack = true`).
pub fn stack(
    store: &ClientStore,
    work: Rect,
    master_size: i32,
    growth: i32,
    border_width: i32,
    bstack: bool,
    hh: i32,
    cy: i32,
) -> Vec<Placement> {
    let mut placements = Vec::new();
    let tileable: Vec<_> = store.iter().filter(|c| !c.is_isfft()).collect();
    let (master, stack_clients) = match tileable.split_first() {
        Some((m, rest)) => (*m, rest),
        None => return placements,
    };

    let n = stack_clients.len() as i32;
    let bw = border_width;
    let ww = work.w as i32;

    if n == 0 {
        placements.push((
            master.win,
            Rect::new(0, cy, (ww - 2 * bw).max(0) as u32, (hh - 2 * bw).max(0) as u32),
        ));
        return placements;
    }

    let z0 = if bstack { ww } else { hh };
    let d = (z0 - growth).rem_euclid(n) + growth;
    let z = (z0 - growth) / n;

    if bstack {
        placements.push((
            master.win,
            Rect::new(0, cy, (ww - 2 * bw).max(0) as u32, (master_size - bw).max(0) as u32),
        ));
    } else {
        placements.push((
            master.win,
            Rect::new(0, cy, (master_size - bw).max(0) as u32, (hh - 2 * bw).max(0) as u32),
        ));
    }

    let mut cx = if bstack { 0 } else { master_size };
    let mut cy = cy;
    let cw = (if bstack { hh } else { ww }) - 2 * bw - master_size;
    let ch = z - bw;

    // First stack client gets the growth remainder (`d`) folded into its
    // size; the others split the rest evenly at `ch`. The advance after
    // the first client is `ch + d`, not its own (border-shrunk) size.
    if bstack {
        cy += master_size;
    }
    let (first, rest) = stack_clients.split_first().expect("n > 0 checked above");
    let first_size = (ch - bw + d).max(0) as u32;
    if bstack {
        placements.push((first.win, Rect::new(cx, cy, first_size, cw.max(0) as u32)));
        cx += ch + d;
    } else {
        placements.push((first.win, Rect::new(cx, cy, cw.max(0) as u32, first_size)));
        cy += ch + d;
    }

    for c in rest {
        if bstack {
            placements.push((c.win, Rect::new(cx, cy, ch.max(0) as u32, cw.max(0) as u32)));
            cx += z;
        } else {
            placements.push((c.win, Rect::new(cx, cy, cw.max(0) as u32, ch.max(0) as u32)));
            cy += z;
        }
    }

    placements
}

/// `grid(hh, cy)`: pack tileable clients into a near-square grid, column by
/// column, a special case for `n == 5` forcing 2 columns.
pub fn grid(store: &ClientStore, work: Rect, border_width: i32, hh: i32, cy: i32) -> Vec<Placement> {
    let tileable: Vec<_> = store.iter().filter(|c| !c.is_isfft()).collect();
    let n = tileable.len() as i32;
    if n == 0 {
        return Vec::new();
    }

    let mut cols = 0;
    while cols <= n / 2 {
        if cols * cols >= n {
            break;
        }
        cols += 1;
    }
    if n == 5 {
        cols = 2;
    }
    let cols = cols.max(1);

    let mut rows = n / cols;
    let bw = border_width;
    let ch = hh - bw;
    let cw = (work.w as i32 - bw) / cols;

    let mut placements = Vec::with_capacity(tileable.len());
    let (mut cn, mut rn) = (0, 0);
    for (i, c) in tileable.iter().enumerate() {
        let i = i as i32;
        if i / rows + 1 > cols - n % cols {
            rows = n / cols + 1;
        }
        placements.push((
            c.win,
            Rect::new(
                work.x + cn * cw,
                work.y + cy + rn * ch / rows,
                (cw - bw).max(0) as u32,
                (ch / rows - bw).max(0) as u32,
            ),
        ));
        rn += 1;
        if rn >= rows {
            rn = 0;
            cn += 1;
        }
    }
    placements
}

/// `tile()`: pick the layout engine for the monitor's effective mode and
/// compute the full set of placements for its current desktop.
pub fn tile(monitor: &Monitor, border_width: i32, panel_height: i32, top_panel: bool) -> Vec<Placement> {
    if monitor.store.is_empty() {
        return Vec::new();
    }
    let (hh, cy) = monitor.layout_extent(panel_height, top_panel);
    match monitor.effective_mode() {
        Mode::Monocle => monocle(&monitor.store, monitor.work_area, hh, cy),
        Mode::Tile => stack(
            &monitor.store,
            monitor.work_area,
            monitor.master_size,
            monitor.growth,
            border_width,
            false,
            hh,
            cy,
        ),
        Mode::Bstack => stack(
            &monitor.store,
            monitor.work_area,
            monitor.master_size,
            monitor.growth,
            border_width,
            true,
            hh,
            cy,
        ),
        Mode::Grid => grid(&monitor.store, monitor.work_area, border_width, hh, cy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::Mode;

    fn mon_with(n: usize, mode: Mode) -> Monitor {
        let mut m = Monitor::new(Rect::new(0, 0, 1598, 878), 1, mode, 0.52, true);
        for i in 0..n {
            m.store.add(i as u64 + 1, 0, true);
        }
        m
    }

    #[test]
    fn monocle_fills_work_area_for_every_tileable_client() {
        let m = mon_with(3, Mode::Monocle);
        let placements = tile(&m, 2, 20, true);
        assert_eq!(placements.len(), 3);
        for (_, r) in &placements {
            assert_eq!(r.w, 1598);
        }
    }

    #[test]
    fn single_client_covers_whole_area_minus_border() {
        let m = mon_with(1, Mode::Tile);
        // store.len() <= 1 forces effective_mode() == Monocle regardless of
        // the saved mode — matches monsterwm's `head->next` check in tile().
        let placements = tile(&m, 2, 20, true);
        assert_eq!(placements.len(), 1);
    }

    #[test]
    fn tile_skips_isfft_clients() {
        let mut m = mon_with(2, Mode::Tile);
        m.store.get_mut(2).unwrap().is_floating = true;
        let placements = tile(&m, 2, 20, true);
        // one tileable master, zero stack clients.
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].0, 1);
    }

    #[test]
    fn grid_of_five_uses_two_columns() {
        let m = mon_with(5, Mode::Grid);
        let placements = grid(&m.store, m.work_area, 2, 878, 20);
        assert_eq!(placements.len(), 5);
        // column 0 gets 2 rows, column 1 gets 3 — verified by counting
        // distinct x offsets.
        let xs: std::collections::BTreeSet<i32> = placements.iter().map(|(_, r)| r.x).collect();
        assert_eq!(xs.len(), 2);
    }

    #[test]
    fn stack_master_and_one_stack_client_span_the_work_area() {
        let m = mon_with(2, Mode::Tile);
        let placements = stack(&m.store, m.work_area, m.master_size, 0, 2, false, 878, 20);
        assert_eq!(placements.len(), 2);
        let (master_win, master_rect) = placements[0];
        assert_eq!(master_win, 1);
        assert_eq!(master_rect.x, 0);
        let (_, stack_rect) = placements[1];
        assert!(stack_rect.x > master_rect.w as i32);
    }

    #[test]
    fn growth_shifts_pixels_to_first_stack_client_without_changing_total() {
        let m = mon_with(3, Mode::Tile);
        let base = stack(&m.store, m.work_area, m.master_size, 0, 2, false, 878, 20);
        let grown = stack(&m.store, m.work_area, m.master_size, 40, 2, false, 878, 20);
        assert!(grown[1].1.h > base[1].1.h);
    }

    #[test]
    fn stack_clients_after_the_first_are_contiguous_with_no_gap_or_overlap() {
        // master + 3 stack clients: exercises the i > 0 branch the earlier
        // off-by-BORDER_WIDTH bug never touched (it only showed up with 2+
        // stack clients).
        let m = mon_with(4, Mode::Tile);
        let placements = stack(&m.store, m.work_area, m.master_size, 0, 2, false, 878, 20);
        assert_eq!(placements.len(), 4);
        let (_, first) = placements[1];
        let (_, second) = placements[2];
        let (_, third) = placements[3];
        assert_eq!(second.y, first.y + first.h as i32 + 2);
        assert_eq!(third.y, second.y + second.h as i32 + 2);
        assert_eq!(second.h, third.h);
    }
}
