//! Minimum-cost cursor motion.
//!
//! Lineage: the classic termcap cursor optimizer (Chris Torek's public
//! domain code, via GNU Emacs). Moving the cursor considers five plans:
//! relative motion from where we believe the cursor is, home plus relative,
//! last-line plus relative, carriage-return plus relative, and direct
//! absolute addressing. Plans are priced from a table of precomputed step
//! costs; absolute costs in the table are minima (parameters can change the
//! length), so the real cost is recomputed before committing to absolute.
//!
//! A lost cursor (None) makes every relative plan impossible. Ties prefer
//! absolute addressing, the least fragile of the plans.

use std::io::Write;

use anyhow::Result;

use crate::caps::Capabilities;
use crate::cost::Cost;
use crate::param;
use crate::screen::Screen;

/// Precomputed padded costs of the motion capabilities. Computed once at
/// startup and again whenever the capability table changes.
#[derive(Debug, Clone, Copy)]
pub struct MotionCosts {
    pub up: Cost,
    pub down: Cost,
    pub left: Cost,
    pub right: Cost,
    pub home: Cost,
    pub cr: Cost,
    pub ll: Cost,
    pub tab: Cost,
    /// Minimum costs: expanded with zero parameters, which no terminal
    /// seems to render longer than any other coordinate.
    pub abs: Cost,
    pub habs: Cost,
    pub vabs: Cost,
}

impl MotionCosts {
    pub fn compute(caps: &Capabilities, baud: u32) -> MotionCosts {
        let cost = |cap: &Option<Vec<u8>>| match cap {
            Some(c) => Cost::Chars(param::padded_len(c, 1, baud) as u32),
            None => Cost::Infeasible,
        };
        let cm_cost = |cap: &Option<Vec<u8>>| match cap {
            Some(c) => {
                let e = param::expand(c, &[0, 0]);
                Cost::Chars(param::padded_len(&e, 1, baud) as u32)
            }
            None => Cost::Infeasible,
        };

        MotionCosts {
            up: cost(&caps.cursor_up),
            down: cost(&caps.cursor_down),
            left: cost(&caps.cursor_left),
            right: cost(&caps.cursor_right),
            home: cost(&caps.cursor_home),
            cr: cost(&caps.carriage_return),
            ll: cost(&caps.cursor_to_ll),
            tab: if caps.init_tabs.is_some() {
                cost(&caps.tab)
            } else {
                Cost::Infeasible
            },
            abs: cm_cost(&caps.cursor_address),
            habs: cm_cost(&caps.column_address),
            vabs: cm_cost(&caps.row_address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Rel,
    Home,
    LastLine,
    Cr,
}

impl<W: Write> Screen<W> {
    /// Moves the cursor to `(row, col)`, absolute, origin zero.
    pub fn move_cursor(&mut self, row: usize, col: usize) -> Result<()> {
        if self.cursor() == Some((row, col)) {
            return Ok(());
        }
        if !self.caps().move_standout_mode {
            self.turn_off_standout()?;
        }
        if !self.caps().move_insert_mode {
            self.turn_off_insert()?;
        }
        self.goto(row, col)
    }

    fn goto(&mut self, row: usize, col: usize) -> Result<()> {
        // A phantom column from a magic wrap is not a position we can plan
        // from; CRLF first, to reach a defined state.
        self.check_magic_wrap()?;

        if self.cursor() == Some((row, col)) {
            return Ok(());
        }

        let costs = *self.costs();
        let rows = self.rows();
        let mut origin = Origin::Rel;

        let (relcost, direct_min, direct_cap, direct_params): (Cost, Cost, Option<Vec<u8>>, Vec<i64>) =
            if let Some((cy, cx)) = self.cursor() {
                let mut relcost = self.relative(cy, cx, row, col, false)?;
                if costs.home.is_feasible() {
                    let c = costs.home + self.relative(0, 0, row, col, false)?;
                    if c < relcost {
                        relcost = c;
                        origin = Origin::Home;
                    }
                }
                if costs.ll.is_feasible() {
                    let c = costs.ll + self.relative(rows - 1, 0, row, col, false)?;
                    if c < relcost {
                        relcost = c;
                        origin = Origin::LastLine;
                    }
                }
                if costs.cr.is_feasible() {
                    let c = if self.caps().carriage_return_does_lf {
                        if cy + 1 >= rows {
                            Cost::Infeasible
                        } else {
                            costs.cr + self.relative(cy + 1, 0, row, col, false)?
                        }
                    } else {
                        costs.cr + self.relative(cy, 0, row, col, false)?
                    };
                    if c < relcost {
                        relcost = c;
                        origin = Origin::Cr;
                    }
                }

                let mut dmin = costs.abs;
                let mut dcap = self.caps().cursor_address.clone();
                let mut dparams = vec![row as i64, col as i64];
                if row == cy && costs.habs.is_feasible() {
                    dmin = costs.habs;
                    dcap = self.caps().column_address.clone();
                    dparams = vec![col as i64];
                } else if col == cx && costs.vabs.is_feasible() {
                    dmin = costs.vabs;
                    dcap = self.caps().row_address.clone();
                    dparams = vec![row as i64];
                }
                (relcost, dmin, dcap, dparams)
            } else {
                (
                    Cost::Chars(100_000),
                    Cost::ZERO,
                    self.caps().cursor_address.clone(),
                    vec![row as i64, col as i64],
                )
            };

        // Equal costs go to the direct plan: when it is no worse, it is the
        // least fragile.
        if direct_min <= relcost {
            match direct_cap {
                Some(cap) => {
                    let expanded = param::expand(&cap, &direct_params);
                    let real = Cost::Chars(param::padded_len(&expanded, 1, self.baud()) as u32);
                    if real <= relcost {
                        tracing::trace!(row, col, cost = ?real, "motion: direct");
                        self.emit(&expanded, 1)?;
                        self.at(row, col);
                        return Ok(());
                    }
                }
                None => {
                    // Lost cursor and no absolute addressing: nothing to
                    // trust. Mark the screen and stay lost.
                    self.oops()?;
                    return Ok(());
                }
            }
        }

        match origin {
            Origin::Home => {
                let cap = self.caps().cursor_home.clone();
                self.emit_if(cap, 1)?;
                self.at(0, 0);
            }
            Origin::LastLine => {
                let cap = self.caps().cursor_to_ll.clone();
                self.emit_if(cap, 1)?;
                self.at(rows - 1, 0);
            }
            Origin::Cr => {
                let cap = self.caps().carriage_return.clone();
                self.emit_if(cap, 1)?;
                let (cy, _) = self.cursor().unwrap();
                let cy = if self.caps().carriage_return_does_lf {
                    cy + 1
                } else {
                    cy
                };
                self.at(cy, 0);
            }
            Origin::Rel => {}
        }

        let Some((cy, cx)) = self.cursor() else {
            self.oops()?;
            return Ok(());
        };
        let emitted = self.relative(cy, cx, row, col, true)?;
        if emitted.is_feasible() {
            self.at(row, col);
        }
        Ok(())
    }

    /// Cost to move `(sy, sx)` to `(dy, dx)` with single steps and hardware
    /// tabs; performs the motion when `doit` is set. An infeasible plan
    /// writes the visible OOPS marker (when emitting) and loses the cursor.
    fn relative(&mut self, sy: usize, sx: usize, dy: usize, dx: usize, doit: bool) -> Result<Cost> {
        // Fresh magic wrap: the cursor position is not to be believed.
        if let Some((_, cx)) = self.cursor() {
            if cx == self.cols() {
                if doit {
                    self.oops()?;
                }
                return Ok(Cost::Infeasible);
            }
        }

        let costs = *self.costs();
        let mut total = Cost::ZERO;

        if dy != sy {
            let (cap, step, n) = if dy < sy {
                (self.caps().cursor_up.clone(), costs.up, sy - dy)
            } else {
                (self.caps().cursor_down.clone(), costs.down, dy - sy)
            };
            if !step.is_feasible() {
                if doit {
                    self.oops()?;
                }
                return Ok(Cost::Infeasible);
            }
            total = total + step.times(n);
            if doit {
                for _ in 0..n {
                    self.emit_if(cap.clone(), 1)?;
                }
            }
        }

        let mut sx = sx;
        if dx == sx {
            return Ok(total);
        }

        if dx > sx && costs.tab.is_feasible() && self.use_tabs {
            let tab_width = self.caps().init_tabs.unwrap() as usize;
            let deltax = dx - sx;

            // ntabs stops at or before the target; one more overshoots,
            // valid only while it stays on screen.
            let ntabs = (deltax + sx % tab_width) / tab_width;
            let mut n2tabs = ntabs + 1;
            let mut tabx = (sx / tab_width + ntabs) * tab_width;
            let tab2x = tabx + tab_width;
            if tab2x >= self.cols() {
                n2tabs = 0;
            }

            let mut tabcost = if ntabs != 0 {
                costs.tab.times(ntabs) + costs.right.times(dx - tabx)
            } else {
                Cost::Infeasible
            };
            let overshoot = if n2tabs != 0 {
                costs.tab.times(n2tabs) + costs.left.times(tab2x - dx)
            } else {
                Cost::Infeasible
            };

            let mut use_tabs_n = ntabs;
            if overshoot < tabcost {
                use_tabs_n = n2tabs;
                tabcost = overshoot;
                tabx = tab2x;
            }

            if tabcost.is_feasible() && tabcost < costs.right.times(deltax) {
                // Only the tab legs are booked here; the remainder motion
                // is priced once by the common tail below.
                total = total + costs.tab.times(use_tabs_n);
                if doit {
                    let cap = self.caps().tab.clone();
                    for _ in 0..use_tabs_n {
                        self.emit_if(cap.clone(), 1)?;
                    }
                }
                sx = tabx;
            }
        }

        if dx != sx {
            let (cap, step, n) = if dx > sx {
                (self.caps().cursor_right.clone(), costs.right, dx - sx)
            } else {
                (self.caps().cursor_left.clone(), costs.left, sx - dx)
            };
            if !step.is_feasible() {
                if doit {
                    self.oops()?;
                }
                return Ok(Cost::Infeasible);
            }
            total = total + step.times(n);
            if doit {
                for _ in 0..n {
                    self.emit_if(cap.clone(), 1)?;
                }
            }
        }

        Ok(total)
    }

    fn oops(&mut self) -> Result<()> {
        tracing::warn!("relative motion infeasible; emitting OOPS and losing the cursor");
        self.write_raw(b"OOPS")?;
        self.lose_cursor();
        Ok(())
    }
}
