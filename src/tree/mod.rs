//! Collection tree model and the pure algorithms over it.

pub mod flatten;
pub mod locate;
pub mod node;
pub mod patch;

pub use flatten::{analysis_summary, audit_summary, endpoint_summaries, flatten, EndpointDescriptor};
pub use locate::{locate, locate_mut};
pub use node::{
    Auth, Collection, CollectionInfo, CollectionSummary, Event, FolderNode, Header, HeaderList,
    Method, Node, NodeKind, PathSegment, QueryParam, RequestBody, RequestNode, RequestPayload,
    RequestUrl, Script, UrlParts, UrlPath,
};
pub use patch::{inject_test_script, TEST_EVENT};
