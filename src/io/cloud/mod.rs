//! Object storage and warehouse abstractions.
//!
//! The batch core only needs to list, read and write objects, plus issue one
//! statement against a warehouse. Those capabilities are expressed as the
//! synchronous [`ObjectIO`] and [`WarehouseIO`] traits so any provider (S3,
//! GCS, an in-house store) can be plugged in, and so runs can be tested
//! entirely in memory with [`FakeObjectIO`] and [`FakeWarehouseIO`].
//!
//! ```
//! use prefixflow::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let storage = FakeObjectIO::new();
//! storage.put_object("bucket", "input/part_00.gz", b"data")?;
//!
//! let listed = storage.list_objects("bucket", Some("input/"))?;
//! assert_eq!(listed[0].key, "input/part_00.gz");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`CloudResult<T>`] where the error is [`CloudIOError`],
//! categorised by [`ErrorKind`]. The batch core wraps these in
//! [`EtlError::Storage`](crate::error::EtlError::Storage) or
//! [`EtlError::Warehouse`](crate::error::EtlError::Warehouse) and never retries.

pub mod fake;
pub mod logged;
pub mod traits;

pub use fake::*;
pub use logged::LoggedObjectIO;
pub use traits::*;
