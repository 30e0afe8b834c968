//! Wire messages for the supported permission services
//!
//! Hand-maintained subsets of the upstream protobuf messages, limited to the
//! single check RPC each backend adapter issues. Field tags match upstream.
//! The client stubs are generated by `build.rs`.

pub mod authzed;
pub mod keto;
