use time::OffsetDateTime;

use crate::profile::{OrgStatus, Profile, RoleAttributes};

/// Single source of truth for organization status.
///
/// A recipient is active once its profile is complete: organization name, at least one sector,
/// at least one target group, state, city, and zip code. A provider is active while its funding
/// deadline has not elapsed; an open-ended deadline never elapses.
pub fn derive_status(profile: &Profile, now: OffsetDateTime) -> OrgStatus {
	let active = match &profile.attributes {
		RoleAttributes::Provider(terms) => terms.deadline.is_none_or(|deadline| deadline >= now),
		RoleAttributes::Recipient(_) => recipient_profile_complete(profile),
	};

	if active { OrgStatus::Active } else { OrgStatus::Inactive }
}

pub fn recipient_profile_complete(profile: &Profile) -> bool {
	present(profile.organization_name.as_deref())
		&& !profile.sectors.is_empty()
		&& !profile.target_groups.is_empty()
		&& present(profile.state.as_deref())
		&& present(profile.city.as_deref())
		&& present(profile.zip_code.as_deref())
}

fn present(value: Option<&str>) -> bool {
	value.is_some_and(|value| !value.trim().is_empty())
}
