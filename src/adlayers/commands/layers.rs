//! Layer posts and the priority list.
//!
//! The priority list follows the posts: a newly created layer is appended,
//! a published layer that is saved again keeps its position (its title is
//! refreshed), and unpublishing or deleting a layer removes its entry.
//! Auto-drafts never touch the list.

use crate::commands::{CmdMessage, CmdResult, ListedLayer};
use crate::error::{AdLayersError, Result};
use crate::model::{AdLayer, LayerMeta, LayerRef, PostId, PostStatus, TermId};
use crate::store::SiteStore;
use std::collections::{BTreeMap, BTreeSet};

/// Create a layer post with a fresh id.
pub fn create<S: SiteStore>(
    store: &mut S,
    title: String,
    status: PostStatus,
    meta: LayerMeta,
    terms: BTreeMap<String, Vec<TermId>>,
) -> Result<CmdResult> {
    let id = store.allocate_id()?;
    let mut layer = AdLayer::new(id, title, status);
    layer.meta = meta;
    layer.terms = terms;
    save(store, layer)
}

/// Store a layer post and bring the priority list in line with it.
pub fn save<S: SiteStore>(store: &mut S, layer: AdLayer) -> Result<CmdResult> {
    let is_update = store.get_layer(layer.id).is_ok();
    store.save_layer(&layer)?;

    let mut result = CmdResult::default();
    if layer.status == PostStatus::AutoDraft {
        return Ok(result.with_affected_layers(vec![layer]));
    }

    let mut priority = store.priority()?;
    let position = priority.iter().position(|entry| entry.post_id == layer.id);

    if is_update && !layer.is_published() {
        if let Some(position) = position {
            priority.remove(position);
            result.add_message(CmdMessage::info(format!(
                "Layer \"{}\" is {} and was removed from the priority list",
                layer.title, layer.status
            )));
        }
    } else {
        match position.filter(|_| is_update) {
            Some(position) => priority[position] = layer.as_ref(),
            None => {
                // A stale entry for a reused id is replaced, never duplicated.
                priority.retain(|entry| entry.post_id != layer.id);
                priority.push(layer.as_ref());
            }
        }
    }
    store.set_priority(&priority)?;
    tracing::debug!(layer = %layer.id, entries = priority.len(), "priority list updated");

    result.add_message(CmdMessage::success(format!(
        "Saved layer {} \"{}\"",
        layer.id, layer.title
    )));
    Ok(result
        .with_affected_layers(vec![layer])
        .with_priority(priority))
}

/// Fields to change on an existing layer. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct LayerUpdate {
    pub title: Option<String>,
    pub status: Option<PostStatus>,
    pub meta: Option<LayerMeta>,
    pub terms: Option<BTreeMap<String, Vec<TermId>>>,
}

/// Apply an update to a stored layer and save it.
pub fn update<S: SiteStore>(store: &mut S, id: PostId, update: LayerUpdate) -> Result<CmdResult> {
    let mut layer = store.get_layer(id)?;
    if let Some(title) = update.title {
        layer.title = title;
    }
    if let Some(status) = update.status {
        layer.status = status;
    }
    if let Some(meta) = update.meta {
        layer.meta = meta;
    }
    if let Some(terms) = update.terms {
        layer.terms = terms;
    }
    save(store, layer)
}

/// One layer with its priority.
pub fn show<S: SiteStore>(store: &S, id: PostId) -> Result<CmdResult> {
    let layer = store.get_layer(id)?;
    let priority = priority_of(store, id)?;
    Ok(CmdResult::default().with_listed_layers(vec![ListedLayer { priority, layer }]))
}

/// Delete a layer post and its priority entry.
pub fn delete<S: SiteStore>(store: &mut S, id: PostId) -> Result<CmdResult> {
    let layer = store.get_layer(id)?;
    store.delete_layer(id)?;

    let mut priority = store.priority()?;
    priority.retain(|entry| entry.post_id != id);
    store.set_priority(&priority)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Deleted layer {} \"{}\"",
        layer.id, layer.title
    )));
    Ok(result
        .with_affected_layers(vec![layer])
        .with_priority(priority))
}

/// Set the priority order. `ids` must name exactly the current entries.
pub fn reorder<S: SiteStore>(store: &mut S, ids: &[PostId]) -> Result<CmdResult> {
    let current = store.priority()?;
    let current_ids: BTreeSet<PostId> = current.iter().map(|entry| entry.post_id).collect();
    let requested: BTreeSet<PostId> = ids.iter().copied().collect();

    if requested.len() != ids.len() {
        return Err(AdLayersError::Api(
            "Each layer may appear only once in the priority order".to_string(),
        ));
    }
    if requested != current_ids {
        return Err(AdLayersError::Api(
            "The new order must list exactly the layers currently in the priority list"
                .to_string(),
        ));
    }

    let priority: Vec<LayerRef> = ids
        .iter()
        .filter_map(|id| current.iter().find(|entry| entry.post_id == *id).cloned())
        .collect();
    store.set_priority(&priority)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("Priority updated"));
    Ok(result.with_priority(priority))
}

/// All layer posts: prioritized ones first in priority order, then the rest by id.
pub fn list<S: SiteStore>(store: &S) -> Result<CmdResult> {
    let priority = store.priority()?;
    let mut layers: BTreeMap<PostId, AdLayer> = store
        .list_layers()?
        .into_iter()
        .map(|layer| (layer.id, layer))
        .collect();

    let mut listed = Vec::with_capacity(layers.len());
    for (index, entry) in priority.iter().enumerate() {
        if let Some(layer) = layers.remove(&entry.post_id) {
            listed.push(ListedLayer {
                priority: Some(index + 1),
                layer,
            });
        }
    }
    listed.extend(
        layers
            .into_values()
            .map(|layer| ListedLayer { priority: None, layer }),
    );

    Ok(CmdResult::default()
        .with_listed_layers(listed)
        .with_priority(priority))
}

/// 1-based priority of a layer, if it is in the list.
pub fn priority_of<S: SiteStore>(store: &S, id: PostId) -> Result<Option<usize>> {
    Ok(store
        .priority()?
        .iter()
        .position(|entry| entry.post_id == id)
        .map(|index| index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PRIORITY_OPTION;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn add(store: &mut InMemoryStore, title: &str, status: PostStatus) -> AdLayer {
        create(
            store,
            title.to_string(),
            status,
            LayerMeta::default(),
            BTreeMap::new(),
        )
        .unwrap()
        .affected_layers
        .remove(0)
    }

    fn ids(store: &InMemoryStore) -> Vec<PostId> {
        store
            .priority()
            .unwrap()
            .into_iter()
            .map(|entry| entry.post_id)
            .collect()
    }

    #[test]
    fn create_appends_one_entry() {
        let mut store = InMemoryStore::new();
        let a = add(&mut store, "A", PostStatus::Publish);
        let b = add(&mut store, "B", PostStatus::Publish);
        assert_eq!(ids(&store), vec![a.id, b.id]);
    }

    #[test]
    fn rename_keeps_position() {
        let mut store = InMemoryStore::new();
        let mut a = add(&mut store, "A", PostStatus::Publish);
        let b = add(&mut store, "B", PostStatus::Publish);

        a.title = "A renamed".into();
        save(&mut store, a.clone()).unwrap();

        let priority = store.priority().unwrap();
        assert_eq!(
            priority,
            vec![LayerRef::new(a.id, "A renamed"), LayerRef::new(b.id, "B")]
        );
    }

    #[test]
    fn unpublish_removes_entry() {
        let mut store = InMemoryStore::new();
        let mut a = add(&mut store, "A", PostStatus::Publish);
        let b = add(&mut store, "B", PostStatus::Publish);

        a.status = PostStatus::Draft;
        let result = save(&mut store, a.clone()).unwrap();
        assert_eq!(ids(&store), vec![b.id]);
        assert_eq!(result.messages.len(), 2);

        a.status = PostStatus::Publish;
        save(&mut store, a.clone()).unwrap();
        assert_eq!(ids(&store), vec![b.id, a.id]);
    }

    #[test]
    fn auto_drafts_are_ignored() {
        let mut store = InMemoryStore::new();
        let draft = add(&mut store, "Auto Draft", PostStatus::AutoDraft);
        assert!(ids(&store).is_empty());
        assert!(store.get_layer(draft.id).is_ok());
    }

    #[test]
    fn delete_removes_post_and_entry() {
        let mut store = InMemoryStore::new();
        let a = add(&mut store, "A", PostStatus::Publish);
        let b = add(&mut store, "B", PostStatus::Publish);
        delete(&mut store, a.id).unwrap();
        assert_eq!(ids(&store), vec![b.id]);
        assert!(store.get_layer(a.id).is_err());
        assert!(delete(&mut store, a.id).is_err());
    }

    #[test]
    fn string_ids_match_numeric_ids() {
        let mut store = InMemoryStore::new();
        let mut a = add(&mut store, "A", PostStatus::Publish);
        store
            .update_option(PRIORITY_OPTION, json!([{ "post_id": a.id.to_string(), "title": "A" }]))
            .unwrap();

        a.title = "A2".into();
        save(&mut store, a.clone()).unwrap();
        assert_eq!(store.priority().unwrap(), vec![LayerRef::new(a.id, "A2")]);

        delete(&mut store, a.id).unwrap();
        assert!(store.priority().unwrap().is_empty());
    }

    #[test]
    fn reorder_requires_the_same_set() {
        let mut store = InMemoryStore::new();
        let a = add(&mut store, "A", PostStatus::Publish);
        let b = add(&mut store, "B", PostStatus::Publish);

        reorder(&mut store, &[b.id, a.id]).unwrap();
        assert_eq!(ids(&store), vec![b.id, a.id]);
        assert_eq!(priority_of(&store, a.id).unwrap(), Some(2));

        assert!(reorder(&mut store, &[a.id]).is_err());
        assert!(reorder(&mut store, &[a.id, a.id]).is_err());
        assert!(reorder(&mut store, &[a.id, PostId(99)]).is_err());
    }

    #[test]
    fn list_puts_prioritized_layers_first() {
        let mut store = InMemoryStore::new();
        let a = add(&mut store, "A", PostStatus::Publish);
        let draft = add(&mut store, "Draft", PostStatus::AutoDraft);
        let b = add(&mut store, "B", PostStatus::Publish);
        reorder(&mut store, &[b.id, a.id]).unwrap();

        let listed = list(&store).unwrap().listed_layers;
        let order: Vec<(PostId, Option<usize>)> =
            listed.iter().map(|l| (l.layer.id, l.priority)).collect();
        assert_eq!(
            order,
            vec![(b.id, Some(1)), (a.id, Some(2)), (draft.id, None)]
        );
        assert_eq!(priority_of(&store, draft.id).unwrap(), None);
    }

    #[test]
    fn update_to_draft_leaves_the_priority_list() {
        let mut store = InMemoryStore::new();
        let home = add(&mut store, "Home", PostStatus::Publish);
        let change = LayerUpdate {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        update(&mut store, home.id, change).unwrap();
        assert!(store.priority().unwrap().is_empty());
        assert_eq!(store.get_layer(home.id).unwrap().status, PostStatus::Draft);
    }

    #[test]
    fn show_reports_priority() {
        let mut store = InMemoryStore::new();
        add(&mut store, "Home", PostStatus::Publish);
        let second = add(&mut store, "Section", PostStatus::Publish);
        let listed = show(&store, second.id).unwrap().listed_layers;
        assert_eq!(listed[0].priority, Some(2));
        assert!(show(&store, PostId(99)).is_err());
    }
}
