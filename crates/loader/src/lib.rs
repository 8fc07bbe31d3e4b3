//! Table data loader library.
//!
//! Request shaping for list/filter/sort/paginate/master-detail queries:
//! a criteria builder with bracket and connector bookkeeping, paging state,
//! a parameter bag, keyword search, master-detail assembly and response
//! envelopes. SQL execution and file formats are left to collaborators.

pub mod assembler;
pub mod config;
pub mod criteria;
pub mod error;
pub mod headers;
pub mod loader;
pub mod paging;
pub mod params;
pub mod plan;
pub mod registry;
pub mod render;
pub mod request;
pub mod response;
pub mod search;

pub use assembler::{AsRow, MasterDetail, MergePolicy, Row};
pub use config::LoaderConfig;
pub use criteria::{Connector, Criteria, Criterion, FilterValue, Operator};
pub use error::{LoaderError, ParamError, RenderError};
pub use loader::TableDataLoader;
pub use paging::{Paging, SortDirection, SortSpec};
pub use params::{ParamBag, StandardParam, UserContext};
pub use plan::{PlanStep, RequestPlan};
pub use registry::{
    Component, ComponentDescriptor, ComponentKind, FileExporter, FileLoader, InputFile,
    LoaderContext, LoaderRegistry, ParamProvider,
};
pub use render::{PredicateRenderer, RenderedQuery, SqlRenderer};
pub use request::RequestDescriptor;
pub use response::{DataResponse, ExportResource, ImportResult, LoaderStatus, StatusSeries};
pub use search::{ColumnSearch, KeywordType, TableSearch};
