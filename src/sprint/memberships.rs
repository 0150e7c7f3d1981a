use crate::model::task::Membership;

/// Memberships for a duplicate: the sprint-board placement moves to the
/// backlog section, every other placement is kept as is. Input order is preserved.
pub fn rebuild_memberships(
    memberships: &[Membership],
    sprint_project: &str,
    backlog_section: &str,
) -> Vec<Membership> {
    memberships
        .iter()
        .map(|m| {
            if m.project == sprint_project {
                Membership::new(sprint_project, backlog_section)
            } else {
                m.clone()
            }
        })
        .collect()
}
