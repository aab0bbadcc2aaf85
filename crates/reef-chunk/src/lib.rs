//! Chunk column store, build generations, and radius-based streaming.
#![forbid(unsafe_code)]

pub mod store;
pub mod streaming;

pub use store::{
    BuildDeliveryMismatch, BuildDispatch, Chunk, ChunkMesh, ChunkState, ChunkStore, Delivery,
    MismatchReason, RenderStats, StoreStats, VerticalColumn,
};
pub use streaming::{
    MAX_STREAM_RADIUS, StreamDelta, StreamingPolicy, columns_in_radius, plan_stream,
};
