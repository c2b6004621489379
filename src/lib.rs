//! # Simple Img
//!
//! On-demand image delivery. Originals are stored once, in whatever format
//! they were uploaded in; clients ask for an asset in the format and size
//! they want, and get it.
//!
//! # Architecture: One Request, Cheapest Path First
//!
//! Every request walks the same short decision tree, bailing out at the
//! first stage that can answer it:
//!
//! ```text
//! 1. Validate   format token     →  501 if unsupported
//! 2. Cache      derived key      →  cached bytes if present
//! 3. Locate     originals dir    →  404 if no original
//! 4. Passthrough                 →  original file, if already the right format and size
//! 5. Transform  decode → resize → encode, cached in the background
//! ```
//!
//! Encoding (AVIF especially) dominates request cost, so the cache sits in
//! front of everything that touches pixels, and transformed results are
//! written back without making the client wait.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`delivery`] | The orchestrator: runs the decision tree, maps failures to status classes |
//! | [`request`] | Validated request type: asset id, format token, optional dimensions |
//! | [`cache`] | Deterministic cache keys and the on-disk store with detached writes |
//! | [`locate`] | Finds candidate originals for an asset id and picks one |
//! | [`imaging`] | Format registry, codec adapters, cover-fit math, and the transform engine |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`timing`] | Per-request stage timing reported through `tracing` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Codecs
//!
//! PNG, JPEG and WebP go through the `image` crate. AVIF is encoded with
//! `rav1e` (via `image`) and decoded with `rav1d`. No system libraries, so
//! the binary is self-contained.
//!
//! ## Readable Cache Keys
//!
//! Cache entries are named `<id>?<sorted params>.<format>` rather than a
//! hash. An operator can see at a glance which variants of an asset exist,
//! and clearing one asset's entries is a glob.
//!
//! ## Cover-Fit, Never Distort
//!
//! With one dimension the other follows the aspect ratio; with both, the
//! output is the smallest aspect-preserving size that covers the box. The
//! arithmetic is integer-only, see [`imaging::cover_dimensions`].

pub mod cache;
pub mod config;
pub mod delivery;
pub mod imaging;
pub mod locate;
pub mod output;
pub mod request;
pub mod timing;

#[cfg(test)]
pub(crate) mod test_helpers;
