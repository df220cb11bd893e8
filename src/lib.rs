//! # Payment Streams
//!
//! A payment-streaming escrow: a sender locks funds for a receiver, the funds
//! unlock linearly over a fixed duration once the receiver accepts, and
//! either party can settle at any time.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Uses 4 decimal places via `rust_decimal`
//! - **Injected collaborators**: custody ([`Custody`]) and time ([`Clock`])
//!   are traits; [`Ledger`] and [`ManualClock`] are in-memory implementations
//! - **Conservation**: every payout and refund is drawn from the sender's
//!   custody pool, which always holds exactly the escrow of its streams
//! - **All-or-nothing operations**: fallible steps run before any mutation
//!
//! ## Example
//!
//! ```
//! use payment_streams::{Custody, Decimal4, Ledger, ManualClock, StreamEngine};
//!
//! let mut ledger = Ledger::new();
//! ledger.fund(1, Decimal4::from_units(1000)).unwrap();
//!
//! let mut engine = StreamEngine::new(ledger, ManualClock::new(0));
//! engine.create_stream(1, 2, Decimal4::from_units(1000), 1000).unwrap();
//! engine.accept_stream(2, 1).unwrap();
//!
//! engine.clock_mut().set(400).unwrap();
//! let paid = engine.claim_stream(2, 1).unwrap();
//! assert_eq!(paid, Decimal4::from_units(400));
//! assert_eq!(engine.custody().balance_of(2), Decimal4::from_units(400));
//! ```

pub mod clock;
pub mod custody;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod processor;
pub mod store;
pub mod stream;
pub mod transaction;

/// Identity of a party (sender, receiver or caller).
pub type PartyId = u16;

pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::{Custody, Ledger, PoolHandle, Value};
pub use decimal::Decimal4;
pub use engine::{Settlement, StreamEngine, StreamInfo};
pub use error::{EngineError, Result};
pub use processor::StreamProcessor;
pub use store::{PaymentsAccount, StreamStore};
pub use stream::{vested_amount, Stream, StreamStatus};
pub use transaction::{OpKind, OperationRecord, ParsedOperation};
