//! Table data loader: wires fetch collaborators to a request descriptor and
//! produces response envelopes.
//!
//! Collaborator closures return `anyhow::Result`. Their errors are passed
//! through with `?` and no added context, so callers can downcast the
//! original error.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::assembler::{AsRow, MasterDetail, MergePolicy};
use crate::criteria::{FilterValue, Operator};
use crate::error::{LoaderError, ParamError};
use crate::headers::{apply_request_headers, response_headers};
use crate::paging::SortDirection;
use crate::params::StandardParam;
use crate::registry::{
    FileExporter, FileLoader, InputFile, LoaderContext, extension_of, normalize_extension,
};
use crate::request::RequestDescriptor;
use crate::response::{DataResponse, ExportResource, ImportResult, LoaderStatus};

type Fetch<'a, R> = Box<dyn FnOnce(&RequestDescriptor) -> Result<R> + 'a>;

/// Declarative list/single/delete/export/import loader.
///
/// Configure strategies and the descriptor fluently, then call exactly one
/// `build*`, `export` or `import` method, which consumes the loader.
pub struct TableDataLoader<'a, T> {
    context: &'a LoaderContext,
    request: RequestDescriptor,
    status: LoaderStatus,
    get_data: Option<Fetch<'a, Vec<T>>>,
    count: Option<Fetch<'a, u64>>,
    child_list: Option<Fetch<'a, Vec<T>>>,
    save: Option<Fetch<'a, T>>,
    exec: Option<Fetch<'a, u64>>,
    for_each: Option<Box<dyn FnMut(&mut T) + 'a>>,
    replace_parent_by_child: Option<Vec<String>>,
    input_file: Option<InputFile>,
}

impl<T> TableDataLoader<'static, T> {
    /// Loader bound to [`LoaderContext::global`].
    pub fn new() -> Self {
        Self::with_context(LoaderContext::global())
    }
}

impl<T> Default for TableDataLoader<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> TableDataLoader<'a, T> {
    /// Loader bound to `context`. The context's parameter provider, if any,
    /// pre-fills the descriptor.
    pub fn with_context(context: &'a LoaderContext) -> Self {
        let mut request = RequestDescriptor::new();
        if let Some(provider) = context.provider() {
            provider.fill(&mut request);
        }
        Self {
            context,
            request,
            status: LoaderStatus::Ok,
            get_data: None,
            count: None,
            child_list: None,
            save: None,
            exec: None,
            for_each: None,
            replace_parent_by_child: None,
            input_file: None,
        }
    }

    // -- strategies --------------------------------------------------------

    pub fn use_to_get_data<F>(mut self, fetch: F) -> Self
    where
        F: FnOnce(&RequestDescriptor) -> Result<Vec<T>> + 'a,
    {
        self.get_data = Some(Box::new(fetch));
        self
    }

    pub fn use_to_count<F>(mut self, count: F) -> Self
    where
        F: FnOnce(&RequestDescriptor) -> Result<u64> + 'a,
    {
        self.count = Some(Box::new(count));
        self
    }

    /// Enable master-detail assembly with a batched child fetch.
    pub fn use_child_list<F>(mut self, fetch: F) -> Self
    where
        F: FnOnce(&RequestDescriptor) -> Result<Vec<T>> + 'a,
    {
        self.child_list = Some(Box::new(fetch));
        self
    }

    pub fn use_to_save<F>(mut self, save: F) -> Self
    where
        F: FnOnce(&RequestDescriptor) -> Result<T> + 'a,
    {
        self.save = Some(Box::new(save));
        self
    }

    pub fn use_to_exec<F>(mut self, exec: F) -> Self
    where
        F: FnOnce(&RequestDescriptor) -> Result<u64> + 'a,
    {
        self.exec = Some(Box::new(exec));
        self
    }

    /// Mutation hook run on every fetched item before assembly or export.
    pub fn for_each<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut T) + 'a,
    {
        self.for_each = Some(Box::new(hook));
        self
    }

    /// Flatten a master into its single detail row; with several details,
    /// strip `fields` from each of them.
    pub fn replace_parent_by_child<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.replace_parent_by_child = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_status(mut self, status: LoaderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_input_file(mut self, file: InputFile) -> Self {
        self.input_file = Some(file);
        self
    }

    // -- descriptor passthroughs ---------------------------------------------

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut RequestDescriptor {
        &mut self.request
    }

    /// Run `f` against the descriptor inside a fluent chain.
    pub fn configure(mut self, f: impl FnOnce(&mut RequestDescriptor)) -> Self {
        f(&mut self.request);
        self
    }

    /// Replace the descriptor wholesale.
    pub fn with_request(mut self, request: RequestDescriptor) -> Self {
        self.request = request;
        self
    }

    pub fn add_criterion(
        mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.request.add_criterion(field, value);
        self
    }

    pub fn add_criterion_with(
        mut self,
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.request.add_criterion_with(field, operator, value);
        self
    }

    pub fn set_limit(mut self, limit: u32) -> Self {
        self.request.set_limit(limit);
        self
    }

    pub fn set_offset(mut self, offset: u32) -> Self {
        self.request.set_offset(offset);
        self
    }

    pub fn add_order_by(
        mut self,
        field: impl Into<String>,
        direction: impl Into<SortDirection>,
    ) -> Self {
        self.request.add_order_by(field, direction);
        self
    }

    pub fn add_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.add_param(key, value);
        self
    }

    pub fn set_table(mut self, name: impl Into<String>) -> Self {
        self.request.set_table(name);
        self
    }

    /// Row holding column titles in an imported file.
    pub fn set_header_row_number(mut self, row: u32) -> Self {
        self.request
            .params_mut()
            .insert(StandardParam::HeaderRowNumber.key(), row);
        self
    }

    /// Column name to column index mapping for imports.
    pub fn set_column_mapper(mut self, mapper: BTreeMap<String, u32>) -> Self {
        let mapper: serde_json::Map<String, Value> = mapper
            .into_iter()
            .map(|(name, index)| (name, Value::from(index)))
            .collect();
        self.request
            .params_mut()
            .insert(StandardParam::ColumnMapper.key(), Value::Object(mapper));
        self
    }

    /// Fill paging, sort and keyword state from request headers.
    pub fn apply_headers<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        apply_request_headers(&mut self.request, self.context.config(), accessor);
        self
    }

    /// Structural validation. Not run implicitly by the build methods.
    pub fn validate(&self) -> Result<(), ParamError> {
        self.request.validate()
    }

    // -- terminal operations ---------------------------------------------

    /// Fetch a list, assemble master-detail rows and count.
    pub fn build(mut self) -> Result<DataResponse<T>>
    where
        T: AsRow,
    {
        let Some(get_data) = self.get_data.take() else {
            let headers = response_headers(&self.request, 0);
            return Ok(DataResponse::new(Vec::new(), 0, headers, self.status));
        };

        let mut items = get_data(&self.request)?;
        tracing::debug!(rows = items.len(), "fetched rows");
        self.run_for_each(&mut items);

        if let Some(fetch_children) = self.child_list.take() {
            let assembler = self.assembler();
            assembler.assemble(&mut items, &mut self.request, fetch_children)?;
        }

        let total = match self.count.take() {
            Some(count) => count(&self.request)?,
            None => items.len() as u64,
        };
        let headers = response_headers(&self.request, total);
        Ok(DataResponse::new(items, total, headers, self.status))
    }

    /// Run the save strategy and wrap its single result.
    pub fn build_single(mut self) -> Result<DataResponse<T>> {
        let Some(save) = self.save.take() else {
            return Ok(DataResponse::empty(LoaderStatus::NotFound));
        };
        let item = save(&self.request)?;
        let headers = response_headers(&self.request, 1);
        Ok(DataResponse::new(vec![item], 1, headers, self.status))
    }

    /// Run the exec strategy; the affected count is both item and total.
    pub fn build_delete(mut self) -> Result<DataResponse<u64>> {
        let affected = match self.exec.take() {
            Some(exec) => exec(&self.request)?,
            None => 0,
        };
        let headers = response_headers(&self.request, affected);
        Ok(DataResponse::new(
            vec![affected],
            affected,
            headers,
            self.status,
        ))
    }

    /// Export fetched rows with the exporter registered for `file_name`'s
    /// extension.
    pub fn export(self, file_name: &str) -> Result<ExportResource>
    where
        T: Serialize,
    {
        let extension = normalize_extension(extension_of(file_name));
        let exporter = self
            .context
            .registry()
            .exporter(&extension)
            .ok_or_else(|| LoaderError::NoExporter(extension.clone()))?;
        self.export_with(exporter.as_ref(), file_name)
    }

    /// Export fetched rows with an explicit exporter.
    ///
    /// Zero rows produce an empty body with [`LoaderStatus::NoContent`].
    pub fn export_with(
        mut self,
        exporter: &dyn FileExporter,
        file_name: &str,
    ) -> Result<ExportResource>
    where
        T: Serialize,
    {
        let mut items = match self.get_data.take() {
            Some(get_data) => get_data(&self.request)?,
            None => Vec::new(),
        };
        if items.is_empty() {
            tracing::debug!(file_name, "nothing to export");
            return Ok(ExportResource::new(
                file_name,
                Vec::new(),
                LoaderStatus::NoContent,
            ));
        }
        self.run_for_each(&mut items);

        let rows = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        let body = exporter.export(&rows)?;
        tracing::debug!(rows = rows.len(), bytes = body.len(), "exported rows");
        Ok(ExportResource::new(
            exporter.full_file_name(file_name),
            body,
            self.status,
        ))
    }

    /// Import the attached input file with the loader registered for its
    /// extension.
    pub fn import(self) -> Result<DataResponse<ImportResult>> {
        let extension = self
            .input_file
            .as_ref()
            .ok_or(LoaderError::MissingInputFile)?
            .extension();
        self.import_as(&extension)
    }

    /// Import the attached input file with the loader registered for
    /// `extension`.
    pub fn import_as(self, extension: &str) -> Result<DataResponse<ImportResult>> {
        let extension = normalize_extension(extension);
        let loader = self
            .context
            .registry()
            .loader(&extension)
            .ok_or_else(|| LoaderError::NoLoader(extension.clone()))?;
        self.import_with(loader.as_ref())
    }

    /// Import the attached input file with an explicit loader.
    pub fn import_with(self, loader: &dyn FileLoader) -> Result<DataResponse<ImportResult>> {
        let file = self
            .input_file
            .as_ref()
            .ok_or(LoaderError::MissingInputFile)?;
        let params = self.request.params();

        let result = loader.import_file(file, params.entity(), params.user_id(), params)?;
        tracing::debug!(
            file_name = %file.file_name,
            imported = result.count,
            "imported file"
        );

        let results = vec![result];
        let total = results.iter().map(|r| r.count).sum();
        let headers = response_headers(&self.request, total);
        Ok(DataResponse::new(results, total, headers, self.status))
    }

    fn assembler(&self) -> MasterDetail {
        let assembler = MasterDetail::new(self.context.config());
        match &self.replace_parent_by_child {
            Some(strip) => assembler.with_policy(MergePolicy::FlattenSingle {
                strip: strip.clone(),
            }),
            None => assembler,
        }
    }

    fn run_for_each(&mut self, items: &mut [T]) {
        if let Some(hook) = self.for_each.as_mut() {
            items.iter_mut().for_each(|item| hook(item));
        }
    }
}
