//! Per-link diagnostic counters.

/// Receive-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    /// Bytes fed to the receive state machine.
    pub bytes: u64,
    /// Frames that passed every check and were marked ready.
    pub frames: u64,
    /// Fixed header or closing sync mismatches.
    pub sync_losses: u64,
    /// Sync byte seen in the middle of a frame body.
    pub unexpected_syncs: u64,
    /// Escape byte followed by something other than an escaped reserved byte.
    pub bad_escapes: u64,
    /// Recomputed FCS differed from the wire FCS.
    pub checksum_mismatches: u64,
    /// Frames rejected because they would not fit the receive buffer.
    pub overflows: u64,
    /// Frames abandoned after the line went quiet mid-frame.
    pub idle_timeouts: u64,
}

impl RxStats {
    /// Total number of frames dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.sync_losses
            + self.unexpected_syncs
            + self.bad_escapes
            + self.checksum_mismatches
            + self.overflows
            + self.idle_timeouts
    }
}

/// Transmit-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub frames: u64,
    /// Wire bytes written, stuffing and delimiters included.
    pub bytes: u64,
}

/// Snapshot of both directions of a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub rx: RxStats,
    pub tx: TxStats,
}
