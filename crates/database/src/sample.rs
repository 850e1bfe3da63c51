use crate::backend::Connector;
use crate::connection::ScopedConnection;
use crate::error::DbError;

/// A row of the demo `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleUser {
    pub name: &'static str,
    pub email: &'static str,
    pub age: i64,
}

const fn user(name: &'static str, email: &'static str, age: i64) -> SampleUser {
    SampleUser { name, email, age }
}

/// The demo users. The first four have ages 30, 25, 35 and 28; four are over 40.
pub const SAMPLE_USERS: [SampleUser; 12] = [
    user("John Doe", "john.doe@example.com", 30),
    user("Jane Smith", "jane.smith@example.com", 25),
    user("Bob Johnson", "bob.johnson@example.com", 35),
    user("Alice Brown", "alice.brown@example.com", 28),
    user("Charlie Wilson", "charlie.wilson@example.com", 22),
    user("Diana Miller", "diana.miller@example.com", 45),
    user("Eve Davis", "eve.davis@example.com", 26),
    user("Frank Garcia", "frank.garcia@example.com", 33),
    user("Grace Lee", "grace.lee@example.com", 42),
    user("Henry Taylor", "henry.taylor@example.com", 48),
    user("Ivy Chen", "ivy.chen@example.com", 29),
    user("Jack Robinson", "jack.robinson@example.com", 51),
];

pub const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        age INTEGER
    )";

const INSERT_USER: &str = "INSERT OR IGNORE INTO users (name, email, age) VALUES (?, ?, ?)";

/// Creates the `users` table if needed and inserts [`SAMPLE_USERS`].
///
/// Returns how many rows were actually inserted; users whose email is already
/// present are skipped, so a second call returns 0.
pub fn seed_users<C: Connector>(connection: &ScopedConnection<C>) -> Result<u64, DbError> {
    seed_with(connection, &SAMPLE_USERS)
}

/// Like [`seed_users`], with a caller-chosen set of users. Runs in one session.
pub fn seed_with<C: Connector>(
    connection: &ScopedConnection<C>,
    users: &[SampleUser],
) -> Result<u64, DbError> {
    let inserted = connection.scope(|session| {
        session.execute(CREATE_USERS_TABLE, &[])?;
        let mut inserted = 0;
        for user in users {
            inserted += session.execute(
                INSERT_USER,
                &[user.name.into(), user.email.into(), user.age.into()],
            )?;
        }
        Ok::<_, DbError>(inserted)
    })?;
    tracing::info!("Sample database ready at {}: {} users inserted", connection.target(), inserted);
    Ok(inserted)
}
