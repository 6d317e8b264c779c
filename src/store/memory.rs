use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Error, NewComment, NewPost, NewUser, PostChanges, Store, Unique, UserChanges};
use crate::{
	model::{Author, Comment, Post, User},
	route::model::Paginate,
};

#[derive(Debug, Default)]
struct Tables {
	users: HashMap<Uuid, User>,
	posts: HashMap<Uuid, Post>,
}

impl Tables {
	/// Finds a unique attribute already used by someone other than `except`.
	fn conflict(&self, username: Option<&str>, email: Option<&str>, except: Option<Uuid>) -> Option<Unique> {
		let others = || self.users.values().filter(|user| Some(user.id) != except);

		if let Some(username) = username {
			if others().any(|user| user.username == username) {
				return Some(Unique::Username);
			}
		}

		if let Some(email) = email {
			if others().any(|user| user.email == email) {
				return Some(Unique::Email);
			}
		}

		None
	}

	/// Clones the post with its author's public details attached.
	fn authored(&self, post: &Post) -> Post {
		let mut post = post.clone();
		post.author = self.users.get(&post.posted_by).map(Author::from);
		post
	}
}

/// A store that keeps everything in process memory.
///
/// Used by the tests, and by the server when no database is configured.
/// Everything is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[axum::async_trait]
impl Store for MemoryStore {
	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
		Ok(self.tables.read().await.users.get(&id).cloned())
	}

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
		let tables = self.tables.read().await;

		Ok(tables
			.users
			.values()
			.find(|user| user.username == username)
			.cloned())
	}

	async fn create_user(&self, user: NewUser) -> Result<User, Error> {
		let mut tables = self.tables.write().await;

		if let Some(field) = tables.conflict(Some(&user.username), Some(&user.email), None) {
			return Err(Error::Conflict(field));
		}

		let now = Utc::now();
		let user = User {
			id: Uuid::new_v4(),
			name: user.name,
			username: user.username,
			email: user.email,
			password: user.password,
			profile_pic: String::new(),
			bio: String::new(),
			reset_token: None,
			created_at: now,
			updated_at: now,
		};

		tables.users.insert(user.id, user.clone());

		Ok(user)
	}

	async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, Error> {
		let mut tables = self.tables.write().await;

		if let Some(field) = tables.conflict(
			changes.username.as_deref(),
			changes.email.as_deref(),
			Some(id),
		) {
			return Err(Error::Conflict(field));
		}

		let Some(user) = tables.users.get_mut(&id) else {
			return Ok(None);
		};

		let UserChanges {
			name,
			username,
			email,
			password,
			profile_pic,
			bio,
		} = changes;

		for (field, value) in [
			(&mut user.name, name),
			(&mut user.username, username),
			(&mut user.email, email),
			(&mut user.password, password),
			(&mut user.profile_pic, profile_pic),
			(&mut user.bio, bio),
		] {
			if let Some(value) = value {
				*field = value;
			}
		}

		user.updated_at = Utc::now();

		Ok(Some(user.clone()))
	}

	async fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, Error> {
		let mut tables = self.tables.write().await;

		let Some(user) = tables.users.values_mut().find(|user| user.email == email) else {
			return Ok(None);
		};

		user.reset_token = Some(token.to_owned());
		user.updated_at = Utc::now();

		Ok(Some(user.clone()))
	}

	async fn consume_reset_token(
		&self,
		token: &str,
		password: &str,
	) -> Result<Option<User>, Error> {
		let mut tables = self.tables.write().await;

		let Some(user) = tables
			.users
			.values_mut()
			.find(|user| user.reset_token.as_deref() == Some(token))
		else {
			return Ok(None);
		};

		user.password = password.to_owned();
		user.reset_token = None;
		user.updated_at = Utc::now();

		Ok(Some(user.clone()))
	}

	async fn create_post(&self, post: NewPost) -> Result<Post, Error> {
		let now = Utc::now();
		let post = Post {
			id: Uuid::new_v4(),
			posted_by: post.posted_by,
			author: None,
			text: post.text,
			post_img: post.post_img,
			comments: Vec::new(),
			created_at: now,
			updated_at: now,
		};

		self.tables.write().await.posts.insert(post.id, post.clone());

		Ok(post)
	}

	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error> {
		let tables = self.tables.read().await;

		Ok(tables.posts.get(&id).map(|post| tables.authored(post)))
	}

	async fn list_posts(
		&self,
		posted_by: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<Post>, Error> {
		let tables = self.tables.read().await;

		let mut posts = tables
			.posts
			.values()
			.filter(|post| posted_by.map_or(true, |user| post.posted_by == user))
			.collect::<Vec<_>>();

		posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		Ok(posts
			.into_iter()
			.skip(usize::try_from(paginate.offset()).unwrap_or(0))
			.take(usize::try_from(paginate.limit()).unwrap_or(0))
			.map(|post| tables.authored(post))
			.collect())
	}

	async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, Error> {
		let mut tables = self.tables.write().await;

		let Some(post) = tables.posts.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(text) = changes.text {
			post.text = text;
		}

		if let Some(post_img) = changes.post_img {
			post.post_img = post_img;
		}

		post.updated_at = Utc::now();

		Ok(Some(post.clone()))
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, Error> {
		Ok(self.tables.write().await.posts.remove(&id).is_some())
	}

	async fn push_comment(
		&self,
		post_id: Uuid,
		comment: NewComment,
	) -> Result<Option<Post>, Error> {
		let mut tables = self.tables.write().await;

		let Some(post) = tables.posts.get_mut(&post_id) else {
			return Ok(None);
		};

		post.comments.push(Comment::from_new(comment));
		post.updated_at = Utc::now();

		Ok(Some(post.clone()))
	}

	async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, Error> {
		let mut tables = self.tables.write().await;

		let Some(post) = tables.posts.get_mut(&post_id) else {
			return Ok(false);
		};

		let Some(index) = post.comments.iter().position(|c| c.id == comment_id) else {
			return Ok(false);
		};

		// keeps the remaining comments in order, unlike `swap_remove`
		post.comments.remove(index);
		post.updated_at = Utc::now();

		Ok(true)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn new_user(username: &str, email: &str) -> NewUser {
		NewUser {
			name: username.to_uppercase(),
			username: username.into(),
			email: email.into(),
			password: "hash".into(),
		}
	}

	fn new_comment(user_id: Uuid, text: &str) -> NewComment {
		NewComment {
			user_id,
			text: text.into(),
			author_username: "alice".into(),
			author_profile_img: String::new(),
		}
	}

	#[tokio::test]
	async fn test_unique_username_and_email() {
		let store = MemoryStore::new();

		store
			.create_user(new_user("alice", "alice@x.com"))
			.await
			.unwrap();

		let error = store
			.create_user(new_user("alice", "other@x.com"))
			.await
			.unwrap_err();
		assert!(matches!(error, Error::Conflict(Unique::Username)));

		let error = store
			.create_user(new_user("bob", "alice@x.com"))
			.await
			.unwrap_err();
		assert!(matches!(error, Error::Conflict(Unique::Email)));

		// usernames are case-sensitive
		store
			.create_user(new_user("Alice", "upper@x.com"))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_update_user_keeps_own_username() {
		let store = MemoryStore::new();
		let alice = store
			.create_user(new_user("alice", "alice@x.com"))
			.await
			.unwrap();
		store.create_user(new_user("bob", "bob@x.com")).await.unwrap();

		let updated = store
			.update_user(
				alice.id,
				UserChanges {
					username: Some("alice".into()),
					bio: Some("hi".into()),
					..Default::default()
				},
			)
			.await
			.unwrap()
			.unwrap();

		assert_eq!(updated.bio, "hi");
		assert_eq!(updated.email, "alice@x.com");

		let error = store
			.update_user(
				alice.id,
				UserChanges {
					username: Some("bob".into()),
					..Default::default()
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(error, Error::Conflict(Unique::Username)));
	}

	#[tokio::test]
	async fn test_reset_token_is_single_use() {
		let store = MemoryStore::new();
		let alice = store
			.create_user(new_user("alice", "alice@x.com"))
			.await
			.unwrap();

		assert!(store
			.set_reset_token("nobody@x.com", "token")
			.await
			.unwrap()
			.is_none());
		store.set_reset_token("alice@x.com", "token").await.unwrap();

		assert!(store
			.consume_reset_token("wrong", "new-hash")
			.await
			.unwrap()
			.is_none());

		let unchanged = store.find_user(alice.id).await.unwrap().unwrap();
		assert_eq!(unchanged.password, "hash");
		assert_eq!(unchanged.reset_token.as_deref(), Some("token"));

		let user = store
			.consume_reset_token("token", "new-hash")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(user.id, alice.id);
		assert_eq!(user.password, "new-hash");
		assert_eq!(user.reset_token, None);

		assert!(store
			.consume_reset_token("token", "again")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_posts_carry_author() {
		let store = MemoryStore::new();
		let alice = store
			.create_user(new_user("alice", "alice@x.com"))
			.await
			.unwrap();
		let post = store
			.create_post(NewPost {
				posted_by: alice.id,
				text: "hello".into(),
				post_img: String::new(),
			})
			.await
			.unwrap();

		store
			.update_user(
				alice.id,
				UserChanges {
					profile_pic: Some("https://example.com/alice.png".into()),
					..Default::default()
				},
			)
			.await
			.unwrap();

		let author = store
			.find_post(post.id)
			.await
			.unwrap()
			.unwrap()
			.author
			.unwrap();

		assert_eq!(author.id, alice.id);
		assert_eq!(author.username, "alice");
		assert_eq!(author.profile_pic, "https://example.com/alice.png");
	}

	#[tokio::test]
	async fn test_comments_keep_order() {
		let store = MemoryStore::new();
		let user = Uuid::new_v4();
		let post = store
			.create_post(NewPost {
				posted_by: user,
				text: "hello".into(),
				post_img: String::new(),
			})
			.await
			.unwrap();

		for text in ["one", "two", "three"] {
			store
				.push_comment(post.id, new_comment(user, text))
				.await
				.unwrap()
				.unwrap();
		}

		let post = store.find_post(post.id).await.unwrap().unwrap();
		let second = post.comments[1].id;

		assert!(store.remove_comment(post.id, second).await.unwrap());
		assert!(!store.remove_comment(post.id, second).await.unwrap());

		let post = store.find_post(post.id).await.unwrap().unwrap();
		let texts = post
			.comments
			.iter()
			.map(|c| c.text.as_str())
			.collect::<Vec<_>>();

		assert_eq!(texts, ["one", "three"]);
	}

	#[tokio::test]
	async fn test_list_posts_newest_first() {
		let store = MemoryStore::new();
		let alice = Uuid::new_v4();
		let bob = Uuid::new_v4();

		for (user, text) in [(alice, "first"), (bob, "second"), (alice, "third")] {
			store
				.create_post(NewPost {
					posted_by: user,
					text: text.into(),
					post_img: String::new(),
				})
				.await
				.unwrap();
			// distinct timestamps
			tokio::time::sleep(std::time::Duration::from_millis(2)).await;
		}

		let paginate = Paginate { page: 1, size: 10 };

		let all = store.list_posts(None, &paginate).await.unwrap();
		let texts = all.iter().map(|p| p.text.as_str()).collect::<Vec<_>>();
		assert_eq!(texts, ["third", "second", "first"]);

		let mine = store.list_posts(Some(alice), &paginate).await.unwrap();
		assert_eq!(mine.len(), 2);
		assert!(mine.iter().all(|p| p.posted_by == alice));

		let page = store
			.list_posts(None, &Paginate { page: 2, size: 2 })
			.await
			.unwrap();
		assert_eq!(page.len(), 1);
		assert_eq!(page[0].text, "first");
	}
}
