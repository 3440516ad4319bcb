#![forbid(unsafe_code)]

//! The demo's URL scheme.
//!
//! ```text
//! /
//! /corpus/{slug}--{corpusId}
//! /corpus/{slug}--{corpusId}/item/{mediaType}/{itemId}
//! /corpus/{slug}--{corpusId}/item/{mediaType}/{itemId}/detail
//! /corpus/{slug}--{corpusId}/item/{mediaType}/{itemId}/table/{tableId}
//! ```
//!
//! The media type is percent-encoded. The older
//! `/corpus/{slug}/item/{itemId}[/detail]` form is still read. Unknown
//! corpora or items parse to `None`, which the router treats as the root.

use springstack::{RoutingConfig, slugify};

use crate::data::{
    self, Corpus, DETAIL_KIND, DemoNode, DemoNodeData, TABLE_KIND, corpus_node,
    detail_node, item_node, root_node, table_node,
};

/// `documents--c-docs`.
#[must_use]
pub fn corpus_slug(corpus: &Corpus) -> String {
    format!("{}--{}", slugify(corpus.name), corpus.id)
}

/// Find a corpus by its id or by the id after the last `--` of a slug.
#[must_use]
pub fn find_corpus(slug: &str) -> Option<&'static Corpus> {
    data::corpus(slug).or_else(|| {
        let (_, id) = slug.rsplit_once("--")?;
        data::corpus(id)
    })
}

fn decode(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

/// Parse a demo path into a stack starting at the root.
#[must_use]
pub fn parse_path(path: &str) -> Option<Vec<DemoNode>> {
    let clean = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = clean.split('/').filter(|s| !s.is_empty()).collect();
    let mut stack = vec![root_node()];

    let Some((&first, rest)) = segments.split_first() else {
        return Some(stack);
    };
    if first != "corpus" {
        return None;
    }
    let corpus = find_corpus(&decode(rest.first()?)?)?;
    stack.push(corpus_node(corpus));

    match rest.get(1) {
        None => return Some(stack),
        Some(&"item") => {}
        Some(_) => return None,
    }

    let third = decode(rest.get(2)?)?;
    // A media type always has a slash; a bare item id is the older form.
    let (item_id, tail) = if third.contains('/') {
        (decode(rest.get(3)?)?, rest.get(4..).unwrap_or_default())
    } else {
        (third, rest.get(3..).unwrap_or_default())
    };
    let item = data::item(corpus.id, &item_id)?;
    stack.push(item_node(item, corpus));

    match tail {
        [] => {}
        ["detail", ..] => stack.push(detail_node(item)),
        ["table", table, ..] => stack.push(table_node(item, &decode(table)?)),
        _ => return None,
    }
    Some(stack)
}

/// Write the stack as a demo path.
#[must_use]
pub fn stack_to_path(stack: &[DemoNode]) -> String {
    let Some(corpus) = data::current_corpus(stack) else {
        return "/".to_owned();
    };
    let mut path = format!("/corpus/{}", corpus_slug(corpus));

    let item = stack
        .iter()
        .find(|n| data::is_item_kind(&n.kind) && n.data.as_ref().is_some_and(|d| d.item_id.is_some()));
    let Some(item) = item else {
        return path;
    };
    path.push_str(&format!(
        "/item/{}/{}",
        urlencoding::encode(&item.kind),
        urlencoding::encode(&item.id)
    ));

    if stack.iter().any(|n| n.kind == DETAIL_KIND) {
        path.push_str("/detail");
    } else if let Some(table) = stack
        .iter()
        .filter(|n| n.kind == TABLE_KIND)
        .find_map(|n| n.data.as_ref()?.table_id.as_deref())
    {
        path.push_str(&format!("/table/{}", urlencoding::encode(table)));
    }
    path
}

/// Routing with the demo codec.
#[must_use]
pub fn routing_config() -> RoutingConfig<DemoNodeData> {
    RoutingConfig::new().parse(parse_path).serialize(stack_to_path)
}
