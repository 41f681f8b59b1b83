//! Rule-based role coloring.

use std::collections::HashSet;

use rand::rngs::OsRng;
use rolemask_core::{
  color::{Color, available_colors, select_random_color},
  color_rule::NewColorAssignment,
  config::ConfigFilter,
  platform::{RoleClient, RolePatch},
  role::RoleId,
  store::ObfuscationStore,
};
use tracing::{info, warn};

use crate::{Error, Result, Syncer, control::BatchControl, retry::Sleeper};

impl<S, C, Z> Syncer<S, C, Z>
where
  S: ObfuscationStore,
  C: RoleClient,
  Z: Sleeper,
{
  /// Give each uncolored role matched by an enabled rule a palette color no
  /// other role uses.
  ///
  /// Runs strictly sequentially: the roleset snapshot and the in-memory
  /// available-color set are the only guard against handing out a color
  /// twice. Without `force` this is a no-op while rule sync is disabled in
  /// the global settings. Returns the number of roles newly colored.
  pub async fn sync_color_rules(&self, force: bool, control: &BatchControl) -> Result<usize> {
    let global = self.global_settings().await?;
    if !force && !global.color_rule_sync_enabled {
      info!("color rule sync is disabled; skipping");
      return Ok(0);
    }

    let rules: Vec<_> = self
      .store
      .list_color_rules(true)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter_map(|rule| match rule.matcher() {
        Ok(matcher) => Some((rule, matcher)),
        Err(err) => {
          warn!(rule_id = %rule.rule_id, error = %err, "skipping unusable color rule");
          None
        }
      })
      .collect();

    let roleset = self.fetch_roleset(false).await?;

    // Stale cleanup.
    let (live, stale): (Vec<_>, Vec<_>) = self
      .store
      .list_color_assignments()
      .await
      .map_err(Error::store)?
      .into_iter()
      .partition(|a| roleset.contains_id(a.role_id));
    if !stale.is_empty() {
      let removed = self
        .store
        .delete_color_assignments(stale.iter().map(|a| a.assignment_id).collect())
        .await
        .map_err(Error::store)?;
      info!(removed, "removed color assignments for deleted roles");
    }

    let used: HashSet<Color> = roleset
      .iter()
      .filter(|r| r.color != 0)
      .map(|r| Color::from_rgb(r.color))
      .chain(live.iter().map(|a| a.color))
      .collect();
    let mut claimed: HashSet<RoleId> = live.iter().map(|a| a.role_id).collect();
    let pinned: HashSet<RoleId> = self
      .store
      .list_configs(ConfigFilter { has_fixed_color: Some(true), ..Default::default() })
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter_map(|c| c.tracked_role_id)
      .collect();
    let mut available = available_colors(&self.palette, &used);

    let mut assigned = 0;
    'rules: for (rule, matcher) in &rules {
      for role in roleset.iter() {
        if role.color != 0 || claimed.contains(&role.id) || pinned.contains(&role.id) {
          continue;
        }
        if !matcher.is_match(&role.name) {
          continue;
        }
        if control.should_stop() {
          warn!(assigned, "color rule sync stopped before finishing");
          break 'rules;
        }
        let Some(color) = select_random_color(&available, &mut OsRng) else {
          warn!(assigned, "color palette exhausted");
          break 'rules;
        };

        if let Err(err) = self.patch(role.id, RolePatch::recolor(color)).await {
          warn!(role = %role.name, error = %err, "recolor failed");
          // Later rules must not retry a role its first matching rule failed on.
          claimed.insert(role.id);
          continue;
        }
        available.retain(|c| *c != color);
        claimed.insert(role.id);
        assigned += 1;
        info!(role = %role.name, %color, pattern = %rule.pattern, "assigned role color");

        let record = NewColorAssignment {
          rule_id:   rule.rule_id,
          role_id:   role.id,
          role_name: role.name.clone(),
          color,
        };
        if let Err(err) = self.store.add_color_assignment(record).await {
          warn!(role = %role.name, error = %err, "could not record color assignment");
        }
      }
    }

    for assignment in &live {
      let Some(role) = roleset.role_by_id(assignment.role_id) else {
        continue;
      };
      if role.name != assignment.role_name {
        self
          .store
          .rename_color_assignment(assignment.assignment_id, role.name.clone())
          .await
          .map_err(Error::store)?;
      }
    }

    info!(assigned, "color rule sync finished");
    Ok(assigned)
  }
}
