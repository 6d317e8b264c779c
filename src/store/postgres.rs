use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{Error, NewComment, NewPost, NewUser, PostChanges, Store, Unique, UserChanges};
use crate::{
	model::{Author, Comment, Post, User},
	route::model::Paginate,
};

/// A store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Connects to the database and applies any pending migrations.
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let pool = PgPoolOptions::new().max_connections(16).connect(url).await?;

		sqlx::migrate!("./migrations").run(&pool).await?;

		Ok(Self { pool })
	}

	async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>, Error> {
		Ok(sqlx::query_as::<_, Comment>(
			r#"
				SELECT * FROM comment
				WHERE post_id = $1
				ORDER BY position
			"#,
		)
		.bind(post_id)
		.fetch_all(&self.pool)
		.await?)
	}

	async fn with_comments(&self, mut post: Post) -> Result<Post, Error> {
		post.comments = self.comments(post.id).await?;
		Ok(post)
	}
}

/// A post row joined with the public details of its author.
#[derive(sqlx::FromRow)]
struct AuthoredPost {
	#[sqlx(flatten)]
	post: Post,
	author_username: String,
	author_profile_pic: String,
}

impl From<AuthoredPost> for Post {
	fn from(row: AuthoredPost) -> Self {
		let mut post = row.post;

		post.author = Some(Author {
			id: post.posted_by,
			username: row.author_username,
			profile_pic: row.author_profile_pic,
		});

		post
	}
}

/// A comment row along with the post it belongs to.
#[derive(sqlx::FromRow)]
struct PostComment {
	post_id: Uuid,
	#[sqlx(flatten)]
	comment: Comment,
}

/// Maps unique constraint violations on the user table to [`Error::Conflict`].
fn user_conflict(error: sqlx::Error) -> Error {
	if let sqlx::Error::Database(ref db) = error {
		match db.constraint() {
			Some("user_username_key") => return Error::Conflict(Unique::Username),
			Some("user_email_key") => return Error::Conflict(Unique::Email),
			_ => {}
		}
	}

	Error::Database(error)
}

#[axum::async_trait]
impl Store for PgStore {
	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1"#)
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE username = $1"#)
				.bind(username)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn create_user(&self, user: NewUser) -> Result<User, Error> {
		sqlx::query_as::<_, User>(
			r#"
				INSERT INTO "user" (id, name, username, email, password)
				VALUES ($1, $2, $3, $4, $5)
				RETURNING *
			"#,
		)
		.bind(Uuid::new_v4())
		.bind(user.name)
		.bind(user.username)
		.bind(user.email)
		.bind(user.password)
		.fetch_one(&self.pool)
		.await
		.map_err(user_conflict)
	}

	async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, Error> {
		sqlx::query_as::<_, User>(
			r#"
				UPDATE "user"
				SET name = COALESCE($2, name),
					username = COALESCE($3, username),
					email = COALESCE($4, email),
					password = COALESCE($5, password),
					profile_pic = COALESCE($6, profile_pic),
					bio = COALESCE($7, bio),
					updated_at = now()
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(id)
		.bind(changes.name)
		.bind(changes.username)
		.bind(changes.email)
		.bind(changes.password)
		.bind(changes.profile_pic)
		.bind(changes.bio)
		.fetch_optional(&self.pool)
		.await
		.map_err(user_conflict)
	}

	async fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, Error> {
		Ok(sqlx::query_as::<_, User>(
			r#"
				UPDATE "user"
				SET reset_token = $2, updated_at = now()
				WHERE email = $1
				RETURNING *
			"#,
		)
		.bind(email)
		.bind(token)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn consume_reset_token(
		&self,
		token: &str,
		password: &str,
	) -> Result<Option<User>, Error> {
		Ok(sqlx::query_as::<_, User>(
			r#"
				UPDATE "user"
				SET password = $2, reset_token = NULL, updated_at = now()
				WHERE reset_token = $1
				RETURNING *
			"#,
		)
		.bind(token)
		.bind(password)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn create_post(&self, post: NewPost) -> Result<Post, Error> {
		Ok(sqlx::query_as::<_, Post>(
			r#"
				INSERT INTO post (id, posted_by, text, post_img)
				VALUES ($1, $2, $3, $4)
				RETURNING *
			"#,
		)
		.bind(Uuid::new_v4())
		.bind(post.posted_by)
		.bind(post.text)
		.bind(post.post_img)
		.fetch_one(&self.pool)
		.await?)
	}

	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, AuthoredPost>(
			r#"
				SELECT post.*,
					"user".username AS author_username,
					"user".profile_pic AS author_profile_pic
				FROM post
				JOIN "user" ON "user".id = post.posted_by
				WHERE post.id = $1
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		match post {
			Some(post) => Ok(Some(self.with_comments(post.into()).await?)),
			None => Ok(None),
		}
	}

	async fn list_posts(
		&self,
		posted_by: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<Post>, Error> {
		let mut posts = sqlx::query_as::<_, AuthoredPost>(
			r#"
				SELECT post.*,
					"user".username AS author_username,
					"user".profile_pic AS author_profile_pic
				FROM post
				JOIN "user" ON "user".id = post.posted_by
				WHERE $1::uuid IS NULL OR post.posted_by = $1
				ORDER BY post.created_at DESC
				LIMIT $2 OFFSET $3
			"#,
		)
		.bind(posted_by)
		.bind(paginate.limit())
		.bind(paginate.offset())
		.fetch_all(&self.pool)
		.await?
		.into_iter()
		.map(Post::from)
		.collect::<Vec<_>>();

		let ids = posts.iter().map(|post| post.id).collect::<Vec<_>>();
		let comments = sqlx::query_as::<_, PostComment>(
			r#"
				SELECT * FROM comment
				WHERE post_id = ANY($1)
				ORDER BY position
			"#,
		)
		.bind(&ids)
		.fetch_all(&self.pool)
		.await?;

		for PostComment { post_id, comment } in comments {
			if let Some(post) = posts.iter_mut().find(|post| post.id == post_id) {
				post.comments.push(comment);
			}
		}

		Ok(posts)
	}

	async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, Post>(
			r#"
				UPDATE post
				SET text = COALESCE($2, text),
					post_img = COALESCE($3, post_img),
					updated_at = now()
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(id)
		.bind(changes.text)
		.bind(changes.post_img)
		.fetch_optional(&self.pool)
		.await?;

		match post {
			Some(post) => Ok(Some(self.with_comments(post).await?)),
			None => Ok(None),
		}
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, Error> {
		let status = sqlx::query("DELETE FROM post WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn push_comment(
		&self,
		post_id: Uuid,
		comment: NewComment,
	) -> Result<Option<Post>, Error> {
		let comment = Comment::from_new(comment);
		let mut tx = self.pool.begin().await?;

		let post = sqlx::query_as::<_, Post>(
			r#"
				UPDATE post SET updated_at = now()
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(post_id)
		.fetch_optional(&mut *tx)
		.await?;

		let Some(post) = post else {
			return Ok(None);
		};

		sqlx::query(
			r#"
				INSERT INTO comment (id, post_id, user_id, text, author_username, author_profile_img, created_at)
				VALUES ($1, $2, $3, $4, $5, $6, $7)
			"#,
		)
		.bind(comment.id)
		.bind(post_id)
		.bind(comment.user_id)
		.bind(&comment.text)
		.bind(&comment.author_username)
		.bind(&comment.author_profile_img)
		.bind(comment.created_at)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(Some(self.with_comments(post).await?))
	}

	async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, Error> {
		let status = sqlx::query("DELETE FROM comment WHERE id = $1 AND post_id = $2")
			.bind(comment_id)
			.bind(post_id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}
}
