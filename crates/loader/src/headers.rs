//! Request header parsing and response header derivation.
//!
//! Transport adapters hand in a header accessor; nothing here knows about a
//! concrete HTTP stack.

use std::collections::BTreeMap;

use crate::config::LoaderConfig;
use crate::params::StandardParam;
use crate::request::RequestDescriptor;

/// Response header carrying the independently counted total.
pub const TOTAL_ENTRIES_HEADER: &str = "X-Pagination-Total-Entries";

/// Fill paging, sorting, keyword and custom flags from request headers.
///
/// `accessor` returns the raw header value for a header name. Absent headers
/// leave paging and sorting unset; no default page size or sort is applied.
pub fn apply_request_headers<F>(
    request: &mut RequestDescriptor,
    config: &LoaderConfig,
    accessor: F,
) where
    F: Fn(&str) -> Option<String>,
{
    apply_pagination(request, config, &accessor);
    apply_sorting(request, &accessor);
    apply_keyword(request, &accessor);
    apply_custom_flags(request, &accessor);
}

fn header<F>(accessor: &F, param: StandardParam) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    param.header_name().and_then(accessor)
}

fn parse_number(param: StandardParam, raw: Option<String>) -> Option<u32> {
    let raw = raw?;
    match raw.trim().parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(param = param.key(), value = %raw, "ignoring unparsable header value");
            None
        }
    }
}

fn apply_pagination<F>(request: &mut RequestDescriptor, config: &LoaderConfig, accessor: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let per_page = parse_number(
        StandardParam::PerPage,
        header(accessor, StandardParam::PerPage),
    );
    let page = parse_number(
        StandardParam::CurrentPage,
        header(accessor, StandardParam::CurrentPage),
    );

    let paging = request.paging_mut();
    if let Some(per_page) = per_page {
        paging.set_limit_clamped(per_page, config.max_per_page);
    } else if page.is_some() {
        paging.set_limit(config.default_per_page);
    }

    if let Some(page) = page {
        let limit = paging.limit().unwrap_or(config.default_per_page);
        paging.set_offset((page.max(1) - 1).saturating_mul(limit));
    } else if paging.limit().is_some() && paging.offset().is_none() {
        paging.set_offset(config.default_page);
    }
}

fn apply_sorting<F>(request: &mut RequestDescriptor, accessor: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let field = header(accessor, StandardParam::SortField);
    let order = header(accessor, StandardParam::SortOrder);
    if let (Some(field), Some(order)) = (field, order) {
        request.add_order_by(field, order.as_str());
    }
}

fn apply_keyword<F>(request: &mut RequestDescriptor, accessor: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = header(accessor, StandardParam::KeywordSearch) else {
        return;
    };
    // Form-encoded spaces arrive as '+'.
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(keyword) => {
            request.set_keyword(keyword.into_owned());
            if let Some(kind) = header(accessor, StandardParam::KeywordSearchType) {
                request
                    .params_mut()
                    .insert(StandardParam::KeywordSearchType.key(), kind);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring undecodable keyword header");
        }
    }
}

fn apply_custom_flags<F>(request: &mut RequestDescriptor, accessor: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(custom) = header(accessor, StandardParam::CustomPagination) {
        let enabled = custom.trim().eq_ignore_ascii_case("true");
        request
            .params_mut()
            .insert(StandardParam::CustomPagination.key(), enabled);
    }
}

/// Pagination and sort metadata for a response.
pub fn response_headers(request: &RequestDescriptor, total: u64) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(TOTAL_ENTRIES_HEADER.to_string(), total.to_string());

    let paging = request.paging();
    if let Some(limit) = paging.limit().filter(|l| *l > 0) {
        insert_standard(&mut headers, StandardParam::PerPage, limit.to_string());
        if let Some(offset) = paging.offset() {
            insert_standard(
                &mut headers,
                StandardParam::CurrentPage,
                (offset / limit + 1).to_string(),
            );
        }
    }

    if let Some(sort) = paging.order_by().first() {
        insert_standard(&mut headers, StandardParam::SortField, sort.field.clone());
        insert_standard(
            &mut headers,
            StandardParam::SortOrder,
            sort.direction.to_string(),
        );
    }

    headers
}

fn insert_standard(headers: &mut BTreeMap<String, String>, param: StandardParam, value: String) {
    if let Some(name) = param.header_name() {
        headers.insert(name.to_string(), value);
    }
}
