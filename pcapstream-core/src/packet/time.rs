use std::fmt;
use std::time::Duration;

/// Capture timestamp with microsecond resolution.
///
/// Nanosecond capture formats are truncated on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    micros: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, micros: 0 };

    /// Largest whole-second value whose microsecond count fits an `i64`.
    pub const MAX_SECS: i64 = i64::MAX / 1_000_000 - 1;

    /// Build a timestamp; `micros` values of a second or more carry into `secs`.
    pub fn new(secs: i64, micros: u32) -> Self {
        Self {
            secs: secs.saturating_add(i64::from(micros / 1_000_000)),
            micros: micros % 1_000_000,
        }
    }

    pub fn from_micros(micros: i64) -> Self {
        Self {
            secs: micros.div_euclid(1_000_000),
            micros: micros.rem_euclid(1_000_000) as u32,
        }
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self::from_micros(nanos.div_euclid(1_000))
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn subsec_micros(&self) -> u32 {
        self.micros
    }

    /// Microseconds since the epoch, saturating at the `i64` range.
    pub fn as_micros(&self) -> i64 {
        self.secs
            .saturating_mul(1_000_000)
            .saturating_add(i64::from(self.micros))
    }

    fn total_micros(&self) -> i128 {
        i128::from(self.secs) * 1_000_000 + i128::from(self.micros)
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_elapsed_since(&self, earlier: Timestamp) -> Duration {
        let delta = self.total_micros() - earlier.total_micros();
        if delta <= 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(u64::try_from(delta).unwrap_or(u64::MAX))
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Link-layer header type as recorded in the capture (LINKTYPE_* values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkType(pub u16);

impl LinkType {
    /// BSD loopback, host byte order address family.
    pub const NULL: LinkType = LinkType(0);
    pub const ETHERNET: LinkType = LinkType(1);
    pub const RAW: LinkType = LinkType(101);
    /// OpenBSD loopback, network byte order address family.
    pub const LOOP: LinkType = LinkType(108);
    pub const LINUX_SLL: LinkType = LinkType(113);
    pub const IPV4: LinkType = LinkType(228);
    pub const IPV6: LinkType = LinkType(229);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            LinkType::NULL => Some("NULL"),
            LinkType::ETHERNET => Some("EN10MB"),
            LinkType::RAW => Some("RAW"),
            LinkType::LOOP => Some("LOOP"),
            LinkType::LINUX_SLL => Some("LINUX_SLL"),
            LinkType::IPV4 => Some("IPV4"),
            LinkType::IPV6 => Some("IPV6"),
            _ => None,
        }
    }

    /// Link types whose frames start directly with an IP header.
    pub fn is_raw_ip(&self) -> bool {
        matches!(*self, LinkType::RAW | LinkType::IPV4 | LinkType::IPV6)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
