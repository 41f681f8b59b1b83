//! The `ObfuscationStore` trait: the keyed store behind subjects,
//! configurations, color rules, assignments, global settings, and the
//! subject event outbox.
//!
//! The sync orchestrator and the admin API depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  color_rule::{ColorAssignment, ColorRule, NewColorAssignment, NewColorRule},
  config::{ConfigFilter, ConfigValues, ObfuscationConfig},
  event::OutboxEntry,
  role::RoleId,
  settings::GlobalSettings,
  subject::{NewSubject, Subject, SubjectKey, SubjectKind},
};

/// Abstraction over a rolemask store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ObfuscationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Persist a subject and queue a
  /// [`SubjectEvent::Created`](crate::event::SubjectEvent::Created) in the
  /// same transaction.
  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Subjects ordered by name, optionally filtered by kind.
  fn list_subjects(
    &self,
    kind: Option<SubjectKind>,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Delete a subject, its configuration, and any color assignment that
  /// references the configuration's tracked role. Returns `false` when the
  /// subject did not exist.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Configurations ────────────────────────────────────────────────────

  fn get_config<'a>(
    &'a self,
    key: &'a SubjectKey,
  ) -> impl Future<Output = Result<Option<ObfuscationConfig>, Self::Error>> + Send + 'a;

  /// Return the configuration for `key`, creating it from `defaults` when
  /// absent. The flag reports whether it was created.
  fn get_or_create_config<'a>(
    &'a self,
    key: &'a SubjectKey,
    defaults: ConfigValues,
  ) -> impl Future<Output = Result<(ObfuscationConfig, bool), Self::Error>> + Send + 'a;

  /// Replace the editable values of a configuration.
  fn update_config_values(
    &self,
    config_id: Uuid,
    values: ConfigValues,
  ) -> impl Future<Output = Result<ObfuscationConfig, Self::Error>> + Send + '_;

  fn set_random_key(
    &self,
    config_id: Uuid,
    key: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record that `role_id` was confirmed to carry `name`.
  fn record_applied(
    &self,
    config_id: Uuid,
    role_id: RoleId,
    name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_configs(
    &self,
    filter: ConfigFilter,
  ) -> impl Future<Output = Result<Vec<ObfuscationConfig>, Self::Error>> + Send + '_;

  // ── Global settings ───────────────────────────────────────────────────

  /// The singleton record, or compiled defaults when never saved.
  fn global_settings(
    &self,
  ) -> impl Future<Output = Result<GlobalSettings, Self::Error>> + Send + '_;

  fn save_global_settings(
    &self,
    settings: GlobalSettings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Color rules ───────────────────────────────────────────────────────

  /// Rules in `(priority, created_at)` order.
  fn list_color_rules(
    &self,
    enabled_only: bool,
  ) -> impl Future<Output = Result<Vec<ColorRule>, Self::Error>> + Send + '_;

  fn add_color_rule(
    &self,
    input: NewColorRule,
  ) -> impl Future<Output = Result<ColorRule, Self::Error>> + Send + '_;

  fn delete_color_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Color assignments ─────────────────────────────────────────────────

  fn list_color_assignments(
    &self,
  ) -> impl Future<Output = Result<Vec<ColorAssignment>, Self::Error>> + Send + '_;

  /// Fails when the role or the color is already assigned.
  fn add_color_assignment(
    &self,
    input: NewColorAssignment,
  ) -> impl Future<Output = Result<ColorAssignment, Self::Error>> + Send + '_;

  fn delete_color_assignments(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn rename_color_assignment(
    &self,
    id: Uuid,
    role_name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Outbox ────────────────────────────────────────────────────────────

  /// Oldest unconsumed events first.
  fn pending_events(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<OutboxEntry>, Self::Error>> + Send + '_;

  fn complete_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
