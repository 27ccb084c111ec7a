//! vc_ticket - visual-cryptography event tickets
//!
//! A signed, expiring ticket payload is encoded as a QR code and split into two
//! 2-of-2 visual secret shares. Share A goes to the ticket holder, share B stays
//! with the issuer. Either share alone is uniform noise; overlaying the two
//! (after alignment) reproduces the QR bitmap exactly.
//!
//! ```no_run
//! use vc_ticket::{
//!     AlignmentEngine, MarkerBorder, PayloadSigner, ShareGenerator, SigningSecret, TicketFields,
//! };
//! use vc_ticket::utils::imaging::encode_png;
//!
//! let signer = PayloadSigner::new(&SigningSecret::new("secret"))?;
//! let payload = signer.build(&TicketFields {
//!     name: "Ada".into(),
//!     email: "ada@example.com".into(),
//!     user_uuid: "u-1".into(),
//!     check_in_code: "87654321".into(),
//!     expires_at: 4_102_444_800,
//! })?;
//!
//! let shares = ShareGenerator::default().generate(&payload)?;
//! let engine = AlignmentEngine::new(Some(MarkerBorder::default()));
//! let aligned = engine.align(&encode_png(&shares.share_a)?, &encode_png(&shares.share_b)?)?;
//! assert_eq!(aligned.decoded.as_deref(), Some(payload.as_str()));
//! # Ok::<(), vc_ticket::Error>(())
//! ```

/// Share alignment cascade (fiducial, direct, homography)
pub mod align;
/// Process configuration
pub mod config;
/// Marker, connected-component and keypoint detection
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (BinaryImage, Block, Point)
pub mod models;
/// Signed payload codec
pub mod payload;
/// QR encode / decode
pub mod qr;
/// Reconstruction operator
pub mod reconstruct;
/// Share generation, marker border and label footer
pub mod share;
/// Ticket records, store, rate limiting and redemption
pub mod ticket;
/// Utility functions (binarization, geometry, imaging)
pub mod utils;

pub use align::{Alignment, AlignmentEngine, AlignmentStrategy};
pub use config::{Config, SigningSecret};
pub use error::{Error, ErrorKind, PayloadError, Result};
pub use models::{BinaryImage, Block, Point};
pub use payload::{PayloadSigner, TicketFields};
pub use qr::{ECLevel, QrDecoder};
pub use reconstruct::{Reconstruction, combine};
pub use share::markers::MarkerBorder;
pub use share::{ShareGenerator, SharePair};
pub use ticket::{MemoryTicketStore, TicketService, TicketStatus, TicketStore};
