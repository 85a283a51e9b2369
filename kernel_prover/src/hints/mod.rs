//! Builders for the hints the private kernel circuits consume.
//!
//! Hints are computed out of circuit from the accumulated kernel output and
//! the execution tree; the circuits only check them.

mod call;
mod reset;
mod tail;

pub use call::{build_private_kernel_init_hints, build_private_kernel_inner_hints};
pub use reset::build_private_kernel_reset_inputs;
pub use tail::build_private_kernel_tail_hints;

use l2_common::{ContractAddress, Fr};

use crate::inputs::ResetDimensions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintsError {
    #[error("note hash {value:#x} read by {contract} is neither pending nor known to the note hash tree")]
    UnknownNoteHashRead { contract: ContractAddress, value: Fr },
    #[error("no membership witness for the note hash at leaf {leaf_index}")]
    MissingNoteHashWitness { leaf_index: u64 },
    #[error("nullifier {value:#x} read by {contract} is neither pending nor settled")]
    UnknownNullifierRead { contract: ContractAddress, value: Fr },
    #[error("nullifier at counter {counter} consumes note hash {note_hash:#x} which was never emitted")]
    MissingNullifiedNoteHash { counter: u32, note_hash: Fr },
    #[error("no reset circuit accepts {0:?}")]
    ResetTooLarge(ResetDimensions),
}
