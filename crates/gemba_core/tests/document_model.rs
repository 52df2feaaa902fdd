use gemba_core::model::mutations::{
    add_topic, add_topic_with_id, add_update, add_update_with_id, delete_topic, delete_update,
    edit_update, moved_order, reorder_updates,
};
use gemba_core::{seed_document, Category, CategoryId, DashboardDocument, Topic, Update};

fn sample_document() -> DashboardDocument {
    DashboardDocument {
        rtb: Category {
            id: CategoryId::Rtb,
            title: "Running the Business".to_string(),
            topics: vec![Topic::new("t1", "Osiris"), Topic::new("t2", "Studielink")],
        },
        projects: Category {
            id: CategoryId::Projects,
            title: "Projecten".to_string(),
            topics: vec![],
        },
    }
}

fn with_updates(doc: &DashboardDocument, ids: &[&str]) -> DashboardDocument {
    let mut next = doc.clone();
    for id in ids.iter().rev() {
        next = add_update_with_id(&next, CategoryId::Rtb, "t1", *id, *id, "body");
    }
    next
}

fn update_ids(doc: &DashboardDocument, topic_id: &str) -> Vec<String> {
    doc.find_topic(CategoryId::Rtb, topic_id)
        .unwrap()
        .updates
        .iter()
        .map(|u| u.id.clone())
        .collect()
}

#[test]
fn add_topic_appends_to_target_category_only() {
    let doc = sample_document();
    for category in CategoryId::ALL {
        let (next, topic_id) = add_topic(&doc, category, "Nieuw");
        let topics = &next.category(category).topics;
        assert_eq!(topics.len(), doc.category(category).topics.len() + 1);
        let last = topics.last().unwrap();
        assert_eq!(last.id, topic_id);
        assert_eq!(last.title, "Nieuw");
        assert!(last.updates.is_empty());

        let other = CategoryId::ALL.into_iter().find(|c| *c != category).unwrap();
        assert_eq!(next.category(other), doc.category(other));
    }
}

#[test]
fn add_topic_does_not_touch_input() {
    let doc = sample_document();
    let before = doc.clone();
    let _ = add_topic(&doc, CategoryId::Rtb, "X");
    assert_eq!(doc, before);
}

#[test]
fn delete_topic_is_exact_inverse_of_add_topic() {
    let doc = seed_document();
    for category in CategoryId::ALL {
        let (added, topic_id) = add_topic(&doc, category, "X");
        assert_eq!(delete_topic(&added, category, &topic_id), doc);
    }
}

#[test]
fn delete_topic_with_unknown_id_is_noop() {
    let doc = sample_document();
    assert_eq!(delete_topic(&doc, CategoryId::Rtb, "missing"), doc);
    assert_eq!(delete_topic(&doc, CategoryId::Projects, "t1"), doc);
}

#[test]
fn add_update_prepends_newest_first() {
    let doc = with_updates(&sample_document(), &["a", "b"]);
    assert_eq!(update_ids(&doc, "t1"), vec!["a", "b"]);

    let (next, update_id) = add_update(&doc, CategoryId::Rtb, "t1", "c", "");
    let update_id = update_id.expect("topic exists");
    let ids = update_ids(&next, "t1");
    assert_eq!(ids, vec![update_id.as_str(), "a", "b"]);

    let added = &next.find_topic(CategoryId::Rtb, "t1").unwrap().updates[0];
    assert_eq!(added.title, "c");
    assert_eq!(added.text, "");
}

#[test]
fn add_update_to_missing_topic_returns_unchanged_document() {
    let doc = sample_document();
    let (next, update_id) = add_update(&doc, CategoryId::Projects, "t1", "x", "y");
    assert!(update_id.is_none());
    assert_eq!(next, doc);
}

#[test]
fn edit_update_changes_only_target_fields() {
    let doc = with_updates(&sample_document(), &["a", "b", "c"]);
    let doc = add_update_with_id(&doc, CategoryId::Rtb, "t2", "z", "other", "topic");

    let next = edit_update(&doc, CategoryId::Rtb, "t1", "b", "New title", "New text");
    assert_eq!(update_ids(&next, "t1"), vec!["a", "b", "c"]);

    let topic = next.find_topic(CategoryId::Rtb, "t1").unwrap();
    let before = doc.find_topic(CategoryId::Rtb, "t1").unwrap();
    assert_eq!(
        topic.updates[1],
        Update {
            id: "b".to_string(),
            title: "New title".to_string(),
            text: "New text".to_string(),
        }
    );
    assert_eq!(topic.updates[0], before.updates[0]);
    assert_eq!(topic.updates[2], before.updates[2]);
    assert_eq!(
        next.find_topic(CategoryId::Rtb, "t2"),
        doc.find_topic(CategoryId::Rtb, "t2")
    );
    assert_eq!(next.projects, doc.projects);
}

#[test]
fn edit_update_with_unknown_id_is_noop() {
    let doc = with_updates(&sample_document(), &["a"]);
    assert_eq!(edit_update(&doc, CategoryId::Rtb, "t1", "zz", "x", "y"), doc);
}

#[test]
fn delete_update_keeps_relative_order() {
    let doc = with_updates(&sample_document(), &["a", "b", "c", "d"]);
    let next = delete_update(&doc, CategoryId::Rtb, "t1", "b");
    assert_eq!(update_ids(&next, "t1"), vec!["a", "c", "d"]);
    assert_eq!(delete_update(&next, CategoryId::Rtb, "t1", "b"), next);
}

#[test]
fn reorder_updates_with_permutation_only_changes_order() {
    let doc = with_updates(&sample_document(), &["a", "b", "c"]);
    let mut permuted = doc.find_topic(CategoryId::Rtb, "t1").unwrap().updates.clone();
    permuted.reverse();

    let next = reorder_updates(&doc, CategoryId::Rtb, "t1", permuted);
    assert_eq!(update_ids(&next, "t1"), vec!["c", "b", "a"]);

    let mut before = doc.find_topic(CategoryId::Rtb, "t1").unwrap().updates.clone();
    let mut after = next.find_topic(CategoryId::Rtb, "t1").unwrap().updates.clone();
    before.sort_by(|a, b| a.id.cmp(&b.id));
    after.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(before, after);
}

#[test]
fn reorder_updates_stores_given_sequence_verbatim() {
    let doc = with_updates(&sample_document(), &["a", "b"]);
    let only_b = vec![doc.find_topic(CategoryId::Rtb, "t1").unwrap().updates[1].clone()];
    let next = reorder_updates(&doc, CategoryId::Rtb, "t1", only_b);
    assert_eq!(update_ids(&next, "t1"), vec!["b"]);
}

#[test]
fn moved_order_feeds_reorder_like_a_drop() {
    let doc = with_updates(&sample_document(), &["a", "b", "c"]);
    let updates = &doc.find_topic(CategoryId::Rtb, "t1").unwrap().updates;
    let order = moved_order(updates, 2, 0).expect("valid drop");
    let next = reorder_updates(&doc, CategoryId::Rtb, "t1", order);
    assert_eq!(update_ids(&next, "t1"), vec!["c", "a", "b"]);
}

#[test]
fn generated_ids_do_not_collide_within_one_document() {
    let mut doc = sample_document();
    for index in 0..200 {
        doc = add_topic(&doc, CategoryId::Projects, &format!("topic {index}")).0;
    }
    assert_eq!(doc.validate(), Ok(()));
}

#[test]
fn add_topic_with_id_round_trips_through_json() {
    let doc = add_topic_with_id(&sample_document(), CategoryId::Projects, "p9", "Roadmap");
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["projects"]["id"], "projects");
    assert_eq!(json["projects"]["topics"][0]["id"], "p9");
    assert_eq!(json["projects"]["topics"][0]["updates"], serde_json::json!([]));

    let decoded: DashboardDocument = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, doc);
}

#[test]
fn seed_document_is_valid_and_matches_defaults() {
    let seed = seed_document();
    assert_eq!(seed.validate(), Ok(()));
    assert_eq!(seed.rtb.title, "Running the Business");
    assert_eq!(seed.projects.title, "Projecten");
    assert_eq!(seed.rtb.topics.len(), 5);
    assert_eq!(seed.projects.topics.len(), 3);
    assert_eq!(update_ids(&seed, "t1"), vec!["u1", "u2"]);
}
