//! One-way password hashing with bcrypt.
//!
//! Every hash carries its own random salt and cost, so the same password
//! hashes differently each time and verification needs nothing but the hash.

/// The bcrypt work factor. Fixed; changing it only affects new hashes.
pub const COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("bcrypt error: {0}")]
	Bcrypt(#[from] bcrypt::BcryptError),
	#[error("hashing task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

/// Hashes a password with a fresh random salt.
///
/// Runs on the blocking thread pool since a single hash takes tens of milliseconds.
pub async fn hash(password: String) -> Result<String, Error> {
	Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, COST)).await??)
}

/// Checks a password against a stored hash.
///
/// A malformed hash never matches.
pub async fn verify(password: String, hash: String) -> bool {
	let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;

	match result {
		Ok(Ok(matches)) => matches,
		Ok(Err(error)) => {
			tracing::warn!(%error, "stored password hash is malformed");
			false
		}
		Err(error) => {
			tracing::error!(%error, "password verification task failed");
			false
		}
	}
}
