//! Integration tests for `SqliteStore` against an in-memory database.

use rolemask_core::{
  color::Color,
  color_rule::{NewColorAssignment, NewColorRule},
  config::{ConfigFilter, ConfigValues, Dividers, ObfuscationMethod},
  event::SubjectEvent,
  settings::GlobalSettings,
  store::ObfuscationStore,
  subject::{NewSubject, SubjectKey, SubjectKind},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn group(name: &str) -> NewSubject {
  NewSubject { kind: SubjectKind::Group, name: name.into() }
}

fn state(name: &str) -> NewSubject {
  NewSubject { kind: SubjectKind::State, name: name.into() }
}

fn rule(pattern: &str, priority: u32) -> NewColorRule {
  NewColorRule {
    pattern: pattern.into(),
    case_sensitive: false,
    enabled: true,
    priority,
  }
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_subject() {
  let s = store().await;

  let subject = s.add_subject(group("Fleet Command")).await.unwrap();
  assert_eq!(subject.kind, SubjectKind::Group);

  let fetched = s.get_subject(subject.subject_id).await.unwrap().unwrap();
  assert_eq!(fetched.subject_id, subject.subject_id);
  assert_eq!(fetched.name, "Fleet Command");
}

#[tokio::test]
async fn get_subject_missing_returns_none() {
  let s = store().await;
  assert!(s.get_subject(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_subjects_sorted_and_filtered() {
  let s = store().await;
  s.add_subject(group("Wing B")).await.unwrap();
  s.add_subject(state("Member")).await.unwrap();
  s.add_subject(group("Wing A")).await.unwrap();

  let all = s.list_subjects(None).await.unwrap();
  let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
  assert_eq!(names, ["Member", "Wing A", "Wing B"]);

  let groups = s.list_subjects(Some(SubjectKind::Group)).await.unwrap();
  assert_eq!(groups.len(), 2);
  assert!(groups.iter().all(|g| g.kind == SubjectKind::Group));
}

#[tokio::test]
async fn duplicate_subject_name_per_kind_is_rejected() {
  let s = store().await;
  s.add_subject(group("Ops")).await.unwrap();
  assert!(s.add_subject(group("Ops")).await.is_err());
  // Same name under another kind is fine.
  s.add_subject(state("Ops")).await.unwrap();
}

#[tokio::test]
async fn add_subject_queues_created_event() {
  let s = store().await;
  let subject = s.add_subject(group("Ops")).await.unwrap();

  let pending = s.pending_events(10).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].event, SubjectEvent::Created { subject_id: subject.subject_id });

  s.complete_event(pending[0].event_id).await.unwrap();
  assert!(s.pending_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_events_oldest_first_with_limit() {
  let s = store().await;
  let first = s.add_subject(group("One")).await.unwrap();
  s.add_subject(group("Two")).await.unwrap();
  s.add_subject(group("Three")).await.unwrap();

  let pending = s.pending_events(2).await.unwrap();
  assert_eq!(pending.len(), 2);
  assert_eq!(pending[0].event, SubjectEvent::Created { subject_id: first.subject_id });
}

#[tokio::test]
async fn delete_subject_cascades_config_and_assignment() {
  let s = store().await;
  let subject = s.add_subject(group("Ops")).await.unwrap();
  let key = subject.key();
  let (config, _) = s.get_or_create_config(&key, ConfigValues::default()).await.unwrap();
  s.record_applied(config.config_id, 42, "grp-abc".into()).await.unwrap();

  let r = s.add_color_rule(rule("*", 0)).await.unwrap();
  s.add_color_assignment(NewColorAssignment {
    rule_id:   r.rule_id,
    role_id:   42,
    role_name: "grp-abc".into(),
    color:     Color::from_rgb(0x112233),
  })
  .await
  .unwrap();

  assert!(s.delete_subject(subject.subject_id).await.unwrap());
  assert!(s.get_subject(subject.subject_id).await.unwrap().is_none());
  assert!(s.get_config(&key).await.unwrap().is_none());
  assert!(s.list_color_assignments().await.unwrap().is_empty());
  // The rule itself survives.
  assert_eq!(s.list_color_rules(false).await.unwrap().len(), 1);

  assert!(!s.delete_subject(subject.subject_id).await.unwrap());
}

#[tokio::test]
async fn delete_state_subject_removes_config_by_name() {
  let s = store().await;
  let subject = s.add_subject(state("Member")).await.unwrap();
  let key = subject.key();
  s.get_or_create_config(&key, ConfigValues::default()).await.unwrap();

  assert!(s.delete_subject(subject.subject_id).await.unwrap());
  assert!(s.get_config(&key).await.unwrap().is_none());
}

// ─── Configurations ──────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_config_is_created_once() {
  let s = store().await;
  let key = SubjectKey::State("Member".into());

  let (first, created) = s.get_or_create_config(&key, ConfigValues::default()).await.unwrap();
  assert!(created);
  assert_eq!(first.subject, key);
  assert!(first.tracked_role_id.is_none());

  let other_defaults = ConfigValues { opt_out: true, ..Default::default() };
  let (second, created) = s.get_or_create_config(&key, other_defaults).await.unwrap();
  assert!(!created);
  assert_eq!(second.config_id, first.config_id);
  assert!(!second.values.opt_out);
}

#[tokio::test]
async fn config_values_round_trip_through_columns() {
  let s = store().await;
  let subject = s.add_subject(group("Ops")).await.unwrap();

  let values = ConfigValues {
    method: ObfuscationMethod::Blake2sHex,
    format: "{prefix}{hash8}".into(),
    dividers: Dividers::filtered(['┃', '➖']),
    min_chars_before_divider: 3,
    use_random_key: true,
    random_key: "abcdefghijklmnop".into(),
    fixed_color: Some(Color::from_rgb(0xff8800)),
    ..Default::default()
  };
  let (config, _) = s.get_or_create_config(&subject.key(), values.clone()).await.unwrap();
  assert_eq!(config.values, values);
}

#[tokio::test]
async fn update_values_and_tracking() {
  let s = store().await;
  let key = SubjectKey::State("Member".into());
  let (config, _) = s.get_or_create_config(&key, ConfigValues::default()).await.unwrap();

  let updated = s
    .update_config_values(config.config_id, ConfigValues {
      custom_name: "Crew".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.values.custom_name, "Crew");

  s.set_random_key(config.config_id, "ZZZZZZZZZZZZZZZZ".into()).await.unwrap();
  s.record_applied(config.config_id, 1_234_567_890_123_456_789, "Crew".into())
    .await
    .unwrap();

  let loaded = s.get_config(&key).await.unwrap().unwrap();
  assert_eq!(loaded.values.random_key, "ZZZZZZZZZZZZZZZZ");
  assert_eq!(loaded.tracked_role_id, Some(1_234_567_890_123_456_789));
  assert_eq!(loaded.last_applied_name, "Crew");
}

#[tokio::test]
async fn updates_to_missing_config_fail() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.set_random_key(id, "x".into()).await.unwrap_err();
  assert!(matches!(err, Error::ConfigNotFound(missing) if missing == id));
}

#[tokio::test]
async fn list_configs_applies_filter() {
  let s = store().await;
  let keyed = ConfigValues {
    use_random_key: true,
    random_key: "abcdefghijklmnop".into(),
    ..Default::default()
  };
  s.get_or_create_config(&SubjectKey::State("A".into()), keyed).await.unwrap();
  s.get_or_create_config(&SubjectKey::State("B".into()), ConfigValues {
    fixed_color: Some(Color::from_rgb(0x010203)),
    ..Default::default()
  })
  .await
  .unwrap();

  assert_eq!(s.list_configs(ConfigFilter::default()).await.unwrap().len(), 2);

  let keyed = s
    .list_configs(ConfigFilter { use_random_key: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(keyed.len(), 1);
  assert_eq!(keyed[0].subject, SubjectKey::State("A".into()));

  let pinned = s
    .list_configs(ConfigFilter { has_fixed_color: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(pinned.len(), 1);
  assert_eq!(pinned[0].subject, SubjectKey::State("B".into()));
}

// ─── Global settings ─────────────────────────────────────────────────────────

#[tokio::test]
async fn global_settings_default_then_saved() {
  let s = store().await;
  assert_eq!(s.global_settings().await.unwrap(), GlobalSettings::default());

  let settings = GlobalSettings {
    periodic_sync_enabled: true,
    default_method: ObfuscationMethod::Sha256Hex,
    ..Default::default()
  };
  s.save_global_settings(settings.clone()).await.unwrap();
  s.save_global_settings(settings.clone()).await.unwrap();
  assert_eq!(s.global_settings().await.unwrap(), settings);
}

// ─── Color rules and assignments ─────────────────────────────────────────────

#[tokio::test]
async fn color_rules_ordered_by_priority_then_creation() {
  let s = store().await;
  let late = s.add_color_rule(rule("late*", 5)).await.unwrap();
  let first = s.add_color_rule(rule("a*", 1)).await.unwrap();
  let second = s.add_color_rule(rule("b*", 1)).await.unwrap();
  let off = s
    .add_color_rule(NewColorRule { enabled: false, ..rule("off", 0) })
    .await
    .unwrap();

  let ids: Vec<_> = s
    .list_color_rules(false)
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.rule_id)
    .collect();
  assert_eq!(ids, [off.rule_id, first.rule_id, second.rule_id, late.rule_id]);

  let enabled = s.list_color_rules(true).await.unwrap();
  assert_eq!(enabled.len(), 3);
  assert!(enabled.iter().all(|r| r.enabled));
}

#[tokio::test]
async fn color_assignment_role_and_color_are_unique() {
  let s = store().await;
  let r = s.add_color_rule(rule("*", 0)).await.unwrap();
  let assign = |role_id, rgb| NewColorAssignment {
    rule_id: r.rule_id,
    role_id,
    role_name: format!("role-{role_id}"),
    color: Color::from_rgb(rgb),
  };

  let a = s.add_color_assignment(assign(1, 0x111111)).await.unwrap();
  assert!(s.add_color_assignment(assign(1, 0x222222)).await.is_err());
  assert!(s.add_color_assignment(assign(2, 0x111111)).await.is_err());
  s.add_color_assignment(assign(2, 0x222222)).await.unwrap();

  s.rename_color_assignment(a.assignment_id, "renamed".into()).await.unwrap();
  let listed = s.list_color_assignments().await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].role_name, "renamed");
  assert_eq!(listed[0].color, Color::from_rgb(0x111111));

  let removed = s
    .delete_color_assignments(vec![a.assignment_id, Uuid::new_v4()])
    .await
    .unwrap();
  assert_eq!(removed, 1);
  assert_eq!(s.list_color_assignments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_rule_removes_its_assignments() {
  let s = store().await;
  let r = s.add_color_rule(rule("*", 0)).await.unwrap();
  s.add_color_assignment(NewColorAssignment {
    rule_id:   r.rule_id,
    role_id:   7,
    role_name: "seven".into(),
    color:     Color::from_rgb(0x070707),
  })
  .await
  .unwrap();

  assert!(s.delete_color_rule(r.rule_id).await.unwrap());
  assert!(s.list_color_assignments().await.unwrap().is_empty());
  assert!(!s.delete_color_rule(r.rule_id).await.unwrap());
}

#[tokio::test]
async fn invalid_rule_pattern_is_rejected() {
  let s = store().await;
  let err = s.add_color_rule(rule("", 0)).await.unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}
