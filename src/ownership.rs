use std::fmt;

use uuid::Uuid;

/// The kinds of resource that only their owner may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
	Post,
	Comment,
	Profile,
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Post => "post",
			Self::Comment => "comment",
			Self::Profile => "profile",
		})
	}
}

/// The authenticated user does not own the resource they tried to change.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("you can only change your own {resource}")]
pub struct Forbidden {
	pub resource: Resource,
	pub id: Uuid,
}

/// Ensures `actor` is the owner of the resource. There is no override:
/// not even another authenticated user may act on someone else's resource.
pub fn assert_owner(actor: Uuid, owner: Uuid, resource: Resource, id: Uuid) -> Result<(), Forbidden> {
	if actor == owner {
		Ok(())
	} else {
		Err(Forbidden { resource, id })
	}
}
