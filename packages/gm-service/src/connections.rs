use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
	Error, MatchService, Result, candidates::promote_pair, profiles::organization_not_found,
};
use gm_domain::Role;
use gm_storage::{connections, models::ConnectionSummary, organizations};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConnectRequest {
	pub target_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConnectionResponse {
	pub connection_id: Uuid,
	pub initiator_id: Uuid,
	pub target_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DisconnectResponse {
	pub subject_id: Uuid,
	pub other_id: Uuid,
	pub recomputed: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionDirection {
	Initiated,
	Received,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConnectionItem {
	pub connection_id: Uuid,
	pub org_id: Uuid,
	pub role: Role,
	pub organization_name: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	pub direction: ConnectionDirection,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

impl MatchService {
	/// Records a connection and, in the same transaction, removes the pair from both candidate
	/// sets.
	pub async fn connect(
		&self,
		initiator_id: Uuid,
		req: ConnectRequest,
	) -> Result<ConnectionResponse> {
		let target_id = req.target_id;

		if initiator_id == target_id {
			return Err(Error::InvalidRequest {
				message: "An organization cannot connect to itself.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let initiator = organizations::get_organization(&mut *tx, initiator_id)
			.await?
			.ok_or_else(|| organization_not_found(initiator_id))?;
		let target = organizations::get_organization(&mut *tx, target_id)
			.await?
			.ok_or_else(|| organization_not_found(target_id))?;

		if initiator.role == target.role {
			return Err(Error::InvalidRequest {
				message: format!("Connections require opposite roles; both are {}.", target.role),
			});
		}
		if connections::connection_exists(&mut *tx, initiator_id, target_id).await? {
			return Err(Error::Conflict {
				message: format!("{initiator_id} and {target_id} are already connected."),
			});
		}

		let removed = promote_pair(&mut *tx, initiator_id, target_id).await?;
		let connection_id = Uuid::new_v4();

		connections::insert_connection(&mut *tx, connection_id, initiator_id, target_id, now)
			.await?;

		tx.commit().await?;

		info!(
			connection_id = %connection_id,
			initiator_id = %initiator_id,
			target_id = %target_id,
			candidates_removed = removed,
			"Connection created."
		);

		Ok(ConnectionResponse { connection_id, initiator_id, target_id, created_at: now })
	}

	/// Deletes the connection, then recomputes both sides so each may see the other again.
	/// Recompute failures are logged; the disconnect itself stands.
	pub async fn disconnect(
		&self,
		subject_id: Uuid,
		other_id: Uuid,
	) -> Result<DisconnectResponse> {
		let mut tx = self.db.pool.begin().await?;
		let removed = connections::delete_connection(&mut *tx, subject_id, other_id).await?;

		if removed == 0 {
			return Err(Error::NotFound {
				message: format!("{subject_id} and {other_id} are not connected."),
			});
		}

		tx.commit().await?;

		info!(subject_id = %subject_id, other_id = %other_id, "Connection removed.");

		let mut recomputed = true;

		for org_id in [subject_id, other_id] {
			if let Err(err) = self.recompute(org_id).await {
				recomputed = false;

				warn!(error = %err, org_id = %org_id, "Recompute after disconnect failed.");
			}
		}

		Ok(DisconnectResponse { subject_id, other_id, recomputed })
	}

	/// Connections touching the subject, newest first.
	pub async fn list_connections(&self, subject_id: Uuid) -> Result<Vec<ConnectionItem>> {
		let mut conn = self.db.pool.acquire().await?;

		organizations::get_organization(&mut conn, subject_id)
			.await?
			.ok_or_else(|| organization_not_found(subject_id))?;

		let rows = connections::list_connections(&mut conn, subject_id).await?;

		rows.into_iter().map(|row| connection_item(subject_id, row)).collect()
	}
}

fn connection_item(subject_id: Uuid, row: ConnectionSummary) -> Result<ConnectionItem> {
	let role: Role = row.other_role.parse().map_err(|err| Error::Storage {
		message: format!("Organization {} has an unreadable role: {err}", row.other_id),
	})?;
	let direction = if row.initiator_id == subject_id {
		ConnectionDirection::Initiated
	} else {
		ConnectionDirection::Received
	};

	Ok(ConnectionItem {
		connection_id: row.connection_id,
		org_id: row.other_id,
		role,
		organization_name: row.organization_name,
		profile_picture_url: row.profile_picture_url,
		state: row.state,
		city: row.city,
		direction,
		created_at: row.created_at,
	})
}
