use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Provider,
	Recipient,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Provider => "provider",
			Self::Recipient => "recipient",
		}
	}

	pub fn opposite(self) -> Self {
		match self {
			Self::Provider => Self::Recipient,
			Self::Recipient => Self::Provider,
		}
	}
}
impl FromStr for Role {
	type Err = UnknownVariant;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"provider" => Ok(Self::Provider),
			"recipient" => Ok(Self::Recipient),
			other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
	Active,
	Inactive,
}
impl OrgStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Inactive => "inactive",
		}
	}

	pub fn is_active(self) -> bool {
		matches!(self, Self::Active)
	}
}
impl FromStr for OrgStatus {
	type Err = UnknownVariant;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"active" => Ok(Self::Active),
			"inactive" | "draft" => Ok(Self::Inactive),
			other => Err(UnknownVariant { kind: "status", value: other.to_string() }),
		}
	}
}

/// Project horizon a recipient declares. Each bucket implies a window, measured from now, in which
/// a provider deadline must fall to count as a timeline fit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
	#[serde(alias = "short-term", alias = "1-3 months", alias = "3-6 months")]
	ShortTerm,
	#[serde(alias = "medium-term", alias = "6-12 months")]
	MediumTerm,
	#[serde(alias = "long-term", alias = "12+ months")]
	LongTerm,
}
impl Timeline {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ShortTerm => "short_term",
			Self::MediumTerm => "medium_term",
			Self::LongTerm => "long_term",
		}
	}

	pub fn horizon(self) -> Duration {
		match self {
			Self::ShortTerm => Duration::days(183),
			Self::MediumTerm => Duration::days(365),
			Self::LongTerm => Duration::days(730),
		}
	}

	/// Lenient parse used when reading stored rows. Unknown text yields `None` so scoring treats
	/// it as missing data.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"short_term" | "short-term" | "1-3 months" | "3-6 months" => Some(Self::ShortTerm),
			"medium_term" | "medium-term" | "6-12 months" => Some(Self::MediumTerm),
			"long_term" | "long-term" | "12+ months" => Some(Self::LongTerm),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStage {
	#[serde(alias = "Early Stage")]
	EarlyStage,
	#[serde(alias = "Growth Stage")]
	GrowthStage,
	#[serde(alias = "Mature Stage")]
	MatureStage,
}
impl ProjectStage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::EarlyStage => "early_stage",
			Self::GrowthStage => "growth_stage",
			Self::MatureStage => "mature_stage",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"early_stage" | "early stage" | "early" => Some(Self::EarlyStage),
			"growth_stage" | "growth stage" | "growth" => Some(Self::GrowthStage),
			"mature_stage" | "mature stage" | "mature" => Some(Self::MatureStage),
			_ => None,
		}
	}
}

/// Funding kinds that participate in the stage lookup table. Providers may declare any free-form
/// funding type; only these are recognized by [`FundingType::parse`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FundingType {
	Seed,
	SeriesA,
	SeriesB,
	PitchCompetition,
}
impl FundingType {
	pub fn parse(raw: &str) -> Option<Self> {
		let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");

		match normalized.as_str() {
			"seed" => Some(Self::Seed),
			"series a" => Some(Self::SeriesA),
			"series b" => Some(Self::SeriesB),
			"pitch comp" | "pitch competition" => Some(Self::PitchCompetition),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderTerms {
	pub funding_type: Option<String>,
	pub amount_offered: Option<f64>,
	/// `None` is an open-ended deadline.
	pub deadline: Option<OffsetDateTime>,
	pub region_scope: Option<String>,
	pub eligibility_notes: Option<String>,
	pub application_link: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipientNeeds {
	pub needs: BTreeSet<String>,
	pub budget_requested: Option<f64>,
	pub timeline: Option<Timeline>,
	pub project_stage: Option<ProjectStage>,
	pub team_size: Option<i32>,
	pub prior_funding: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoleAttributes {
	Provider(ProviderTerms),
	Recipient(RecipientNeeds),
}
impl RoleAttributes {
	pub fn role(&self) -> Role {
		match self {
			Self::Provider(_) => Role::Provider,
			Self::Recipient(_) => Role::Recipient,
		}
	}

	pub fn empty_for(role: Role) -> Self {
		match role {
			Role::Provider => Self::Provider(ProviderTerms::default()),
			Role::Recipient => Self::Recipient(RecipientNeeds::default()),
		}
	}
}

/// Everything scoring and status derivation read about one organization. The role is carried by
/// the attribute variant so the two can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
	pub org_id: Uuid,
	pub organization_name: Option<String>,
	pub sectors: BTreeSet<String>,
	pub target_groups: BTreeSet<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	pub zip_code: Option<String>,
	pub attributes: RoleAttributes,
}
impl Profile {
	pub fn new(org_id: Uuid, role: Role) -> Self {
		Self {
			org_id,
			organization_name: None,
			sectors: BTreeSet::new(),
			target_groups: BTreeSet::new(),
			state: None,
			city: None,
			zip_code: None,
			attributes: RoleAttributes::empty_for(role),
		}
	}

	pub fn role(&self) -> Role {
		self.attributes.role()
	}

	pub fn provider_terms(&self) -> Option<&ProviderTerms> {
		match &self.attributes {
			RoleAttributes::Provider(terms) => Some(terms),
			RoleAttributes::Recipient(_) => None,
		}
	}

	pub fn recipient_needs(&self) -> Option<&RecipientNeeds> {
		match &self.attributes {
			RoleAttributes::Recipient(needs) => Some(needs),
			RoleAttributes::Provider(_) => None,
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("Unknown {kind} value {value:?}.")]
pub struct UnknownVariant {
	pub kind: &'static str,
	pub value: String,
}

/// Trims each tag, drops blanks, and collapses duplicates.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	tags.into_iter()
		.map(|tag| tag.as_ref().trim().to_string())
		.filter(|tag| !tag.is_empty())
		.collect()
}
