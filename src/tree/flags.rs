//! Node flag bits stored in the header.

use bitflags::bitflags;

bitflags! {
    /// Per-node flags. Unknown bits are preserved when round-tripping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Created by an edit rather than by the parser.
        const SYNTHETIC = 1 << 0;
        /// Produced by parser error recovery.
        const RECOVERED = 1 << 1;
        /// Name, value or attributes rewritten by an update.
        const MODIFIED = 1 << 2;
    }
}
