pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_organizations.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_organizations.sql")),
				"tables/002_org_profiles.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_org_profiles.sql")),
				"tables/003_provider_terms.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_provider_terms.sql")),
				"tables/004_recipient_needs.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_recipient_needs.sql")),
				"tables/005_connections.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_connections.sql")),
				"tables/006_dismissed_matches.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_dismissed_matches.sql")),
				"tables/007_candidate_scores.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_candidate_scores.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use crate::schema::render_schema;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS organizations"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS candidate_scores"));
		assert!(sql.contains("uq_connections_pair"));
	}
}
