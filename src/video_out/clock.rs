// Clock domains - edge scheduling for the memory and display clocks
//
// Time is counted in units of 1 / (sys_hz * pix_hz) seconds after both rates
// are reduced by their common divisor, so a sys period lasts `pix` units and a
// pix period lasts `sys` units. Edge times are exact integers and never drift.

/// Which domains see a rising edge on a scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edges {
    pub sys: bool,
    pub pix: bool,
}

/// Two free-running clocks with a fixed frequency ratio
#[derive(Debug, Clone)]
pub struct ClockDomains {
    sys_hz: u64,
    pix_hz: u64,
    sys_period: u64,
    pix_period: u64,
    next_sys: u64,
    next_pix: u64,
    sys_edges: u64,
    pix_edges: u64,
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl ClockDomains {
    /// Create the scheduler
    ///
    /// # Panics
    /// Panics if either frequency is zero
    pub fn new(sys_hz: u64, pix_hz: u64) -> Self {
        assert!(sys_hz > 0 && pix_hz > 0, "clock frequencies must be non-zero");
        let divisor = gcd(sys_hz, pix_hz);
        ClockDomains {
            sys_hz,
            pix_hz,
            sys_period: pix_hz / divisor,
            pix_period: sys_hz / divisor,
            next_sys: 0,
            next_pix: 0,
            sys_edges: 0,
            pix_edges: 0,
        }
    }

    /// Memory-side clock frequency
    pub fn sys_hz(&self) -> u64 {
        self.sys_hz
    }

    /// Display-side clock frequency
    pub fn pix_hz(&self) -> u64 {
        self.pix_hz
    }

    /// Memory-side edges so far
    pub fn sys_edges(&self) -> u64 {
        self.sys_edges
    }

    /// Display-side edges so far
    pub fn pix_edges(&self) -> u64 {
        self.pix_edges
    }

    /// Move to the next instant at which at least one clock rises
    pub fn advance(&mut self) -> Edges {
        let now = self.next_sys.min(self.next_pix);
        let edges = Edges {
            sys: self.next_sys == now,
            pix: self.next_pix == now,
        };
        if edges.sys {
            self.next_sys += self.sys_period;
            self.sys_edges += 1;
        }
        if edges.pix {
            self.next_pix += self.pix_period;
            self.pix_edges += 1;
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_clocks_always_coincide() {
        let mut clocks = ClockDomains::new(50_000_000, 50_000_000);
        for _ in 0..10 {
            assert_eq!(clocks.advance(), Edges { sys: true, pix: true });
        }
    }

    #[test]
    fn test_edge_ratio_is_exact() {
        let mut clocks = ClockDomains::new(100_000_000, 25_175_000);
        while clocks.pix_edges() < 25_175 {
            clocks.advance();
        }
        // Periods reduce to 1007 (sys) and 4000 (pix) units; the last pix edge
        // fell at 25_174 * 4000 and every sys edge up to it has been counted
        assert_eq!(clocks.sys_edges(), 25_174 * 4000 / 1007 + 1);
    }

    #[test]
    fn test_two_to_one() {
        let mut clocks = ClockDomains::new(2, 1);
        let seq: Vec<Edges> = (0..4).map(|_| clocks.advance()).collect();
        assert_eq!(
            seq,
            vec![
                Edges { sys: true, pix: true },
                Edges { sys: true, pix: false },
                Edges { sys: true, pix: true },
                Edges { sys: true, pix: false },
            ]
        );
    }
}
