#![deny(missing_docs)]

//! # List Merging
//!
//! Reconciles lists contributed by several fragments describing the same endpoint.
//!
//! Every merge starts from the left list; each right element either replaces the
//! first matching element with `merge(existing, incoming)` or is appended. Elements
//! keep their relative order.

use crate::model::{HttpOperation, HttpParam, HttpResponse, HttpServer, MediaContent};

/// Builds a merge function from a matcher and a combiner.
pub fn merge_lists<T, C, M>(compare: C, merge: M) -> impl Fn(&[T], &[T]) -> Vec<T>
where
    T: Clone,
    C: Fn(&T, &T) -> bool,
    M: Fn(&T, &T) -> T,
{
    move |left, right| {
        let mut out = left.to_vec();
        for incoming in right {
            match out.iter().position(|existing| compare(existing, incoming)) {
                Some(i) => out[i] = merge(&out[i], incoming),
                None => out.push(incoming.clone()),
            }
        }
        out
    }
}

/// Headers match by case-insensitive name; the first definition wins.
pub fn merge_headers(left: &[HttpParam], right: &[HttpParam]) -> Vec<HttpParam> {
    merge_lists(
        |a: &HttpParam, b: &HttpParam| a.name.eq_ignore_ascii_case(&b.name),
        |l: &HttpParam, _| l.clone(),
    )(left, right)
}

/// Contents match by case-insensitive media type; the first definition wins.
pub fn merge_contents(left: &[MediaContent], right: &[MediaContent]) -> Vec<MediaContent> {
    merge_lists(
        |a: &MediaContent, b: &MediaContent| a.media_type.eq_ignore_ascii_case(&b.media_type),
        |l: &MediaContent, _| l.clone(),
    )(left, right)
}

/// Servers match by exact URL; the first definition wins.
pub fn merge_servers(left: &[HttpServer], right: &[HttpServer]) -> Vec<HttpServer> {
    merge_lists(
        |a: &HttpServer, b: &HttpServer| a.url == b.url,
        |l: &HttpServer, _| l.clone(),
    )(left, right)
}

/// Responses match by status code; headers and contents are merged.
pub fn merge_responses(left: &[HttpResponse], right: &[HttpResponse]) -> Vec<HttpResponse> {
    merge_lists(
        |a: &HttpResponse, b: &HttpResponse| a.code == b.code,
        |l: &HttpResponse, r: &HttpResponse| HttpResponse {
            headers: merge_headers(&l.headers, &r.headers),
            contents: merge_contents(&l.contents, &r.contents),
            ..l.clone()
        },
    )(left, right)
}

/// Operations match by path and case-insensitive method; request headers,
/// responses and servers are merged.
pub fn merge_operations(left: &[HttpOperation], right: &[HttpOperation]) -> Vec<HttpOperation> {
    merge_lists(
        |a: &HttpOperation, b: &HttpOperation| {
            a.path == b.path && a.method.eq_ignore_ascii_case(&b.method)
        },
        |l: &HttpOperation, r: &HttpOperation| {
            let mut merged = l.clone();
            merged.request.headers = merge_headers(&l.request.headers, &r.request.headers);
            merged.responses = merge_responses(&l.responses, &r.responses);
            merged.servers = merge_servers(&l.servers, &r.servers);
            merged
        },
    )(left, right)
}
