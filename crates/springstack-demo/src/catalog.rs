#![forbid(unsafe_code)]

//! Which cards each demo panel lists.

use springstack::{HeadlessScene, NodeKey};

use crate::data::{
    self, CORPORA, DETAIL_KIND, DemoNode, FOLDER_KIND, ROOT_KIND, SQLITE_KIND, TABLE_KIND,
    corpus_node, detail_node, item_node, table_node,
};

/// Cards listed in `panel`, in display order.
#[must_use]
pub fn children(panel: &NodeKey) -> Vec<NodeKey> {
    match panel.kind.as_str() {
        ROOT_KIND => CORPORA.iter().map(|c| NodeKey::new(FOLDER_KIND, c.id)).collect(),
        FOLDER_KIND => data::items(&panel.id)
            .iter()
            .map(|item| NodeKey::new(item.media_type, item.id))
            .collect(),
        DETAIL_KIND | TABLE_KIND => Vec::new(),
        _ => item_children(panel),
    }
}

fn item_children(panel: &NodeKey) -> Vec<NodeKey> {
    let Some(item) = CORPORA
        .iter()
        .find_map(|c| data::item(c.id, &panel.id))
    else {
        return Vec::new();
    };
    let mut cards = vec![NodeKey::new(DETAIL_KIND, format!("detail-{}", item.id))];
    if item.media_type == SQLITE_KIND {
        cards.extend(
            data::tables(item)
                .iter()
                .map(|t| NodeKey::new(TABLE_KIND, format!("table-{}-{t}", item.id))),
        );
    }
    cards
}

/// The node a card of the top panel opens, or `None` if `card` is not
/// listed there.
#[must_use]
pub fn open(stack: &[DemoNode], card: &NodeKey) -> Option<DemoNode> {
    let top = stack.last()?.key();
    if !children(&top).contains(card) {
        return None;
    }
    match card.kind.as_str() {
        FOLDER_KIND => data::corpus(&card.id).map(corpus_node),
        DETAIL_KIND => data::current_item(stack).map(detail_node),
        TABLE_KIND => {
            let item = data::current_item(stack)?;
            let table = card.id.strip_prefix(&format!("table-{}-", item.id))?;
            Some(table_node(item, table))
        }
        _ => {
            let corpus = data::current_corpus(stack)?;
            data::item(corpus.id, &card.id).map(|item| item_node(item, corpus))
        }
    }
}

/// A headless scene laid out with the demo catalog.
#[must_use]
pub fn scene() -> HeadlessScene {
    HeadlessScene::new(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_lists_every_corpus() {
        let cards = children(&NodeKey::new(ROOT_KIND, "root"));
        let ids: Vec<&str> = cards.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["c-docs", "c-media", "c-data", "c-diagrams"]);
    }

    #[test]
    fn folders_list_their_files_by_media_type() {
        let cards = children(&NodeKey::new(FOLDER_KIND, "c-docs"));
        assert_eq!(cards[0], NodeKey::new("text/markdown", "md-report"));
        assert_eq!(cards.len(), 3);
    }

    #[test]
    fn databases_list_a_detail_and_their_tables() {
        let cards = children(&NodeKey::new(SQLITE_KIND, "stack-db"));
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0], NodeKey::new(DETAIL_KIND, "detail-stack-db"));
        assert_eq!(cards[2], NodeKey::new(TABLE_KIND, "table-stack-db-edges"));
        assert_eq!(children(&NodeKey::new("text/plain", "notes")).len(), 1);
        assert!(children(&NodeKey::new(DETAIL_KIND, "detail-notes")).is_empty());
    }

    #[test]
    fn open_builds_the_node_behind_a_card() {
        let mut stack = vec![data::root_node()];
        let folder = open(&stack, &NodeKey::new(FOLDER_KIND, "c-data")).unwrap();
        assert_eq!(folder.label(), "Data & Code");
        stack.push(folder);
        let db = open(&stack, &NodeKey::new(SQLITE_KIND, "stack-db")).unwrap();
        stack.push(db);
        let table = open(&stack, &NodeKey::new(TABLE_KIND, "table-stack-db-crumbs")).unwrap();
        assert_eq!(table.label(), "crumbs");
        assert!(open(&stack, &NodeKey::new(FOLDER_KIND, "c-docs")).is_none());
    }
}
