//! End-to-end flows through the `Steel` facade, with the session lock and
//! tracking registry pointed at a scratch home directory.

use libsteel::{DatabaseState, FileLockStore, Registry, Steel, SteelError};
use std::fs;
use std::path::Path;
use tempfile::tempdir;


fn steel_at(home: &Path) -> Steel {
	Steel::with_stores(
		Box::new(FileLockStore::new(home.join(".steel_open"))),
		Registry::new(home.join(".steel_dbs")),
	)
}

#[test]
fn round_trip_through_a_session() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	steel.init(&db).unwrap();
	let added = steel.add("mail", "alice", "p@ss", "m.example", "").unwrap();
	assert_eq!(added.id, 1);

	steel.close("W1").unwrap();

	// The closed database is a container: verifier, then the magic bytes
	let data = fs::read(&db).unwrap();
	assert!(data.len() > libsteel::steelcrypto::VERIFIER_LEN + 4);
	assert_eq!(&data[64..68], &[0x45, 0x75, 0x49, 0x33]);
	assert!(!home.path().join(".steel_open").exists());

	steel.open(&db, "W1").unwrap();
	let record = steel.get(1).unwrap().expect("record should exist");
	assert_eq!(record.title, "mail");
	assert_eq!(record.user, "alice");
	assert_eq!(record.passphrase, "p@ss");
	assert_eq!(record.url, "m.example");
	assert_eq!(record.notes, "");

	steel.close("W1").unwrap();
}

#[test]
fn wrong_passphrase_leaves_the_container_alone() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	steel.init(&db).unwrap();
	steel.add("mail", "alice", "p@ss", "m.example", "").unwrap();
	steel.close("W1").unwrap();
	let before = fs::read(&db).unwrap();

	assert!(matches!(steel.open(&db, "W2"), Err(SteelError::BadPassphrase)));

	assert_eq!(fs::read(&db).unwrap(), before);
	assert_eq!(fs::read_dir(work.path()).unwrap().count(), 1);
	assert!(!home.path().join(".steel_open").exists());
}

#[test]
fn tampering_is_detected_before_any_plaintext_lands() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	steel.init(&db).unwrap();
	steel.add("mail", "alice", "p@ss", "m.example", "").unwrap();
	steel.close("W1").unwrap();

	let mut data = fs::read(&db).unwrap();
	let last = data.len() - 1;
	data[last] ^= 0x01;
	fs::write(&db, &data).unwrap();

	assert!(matches!(steel.open(&db, "W1"), Err(SteelError::Tampered)));
	assert_eq!(fs::read_dir(work.path()).unwrap().count(), 1);
	assert!(!home.path().join(".steel_open").exists());
}

#[test]
fn only_one_database_opens_at_a_time() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let a = work.path().join("a.db");
	let b = work.path().join("b.db");

	steel.init(&a).unwrap();
	steel.close("Wa").unwrap();
	steel.init(&b).unwrap();
	steel.close("Wb").unwrap();

	steel.open(&a, "Wa").unwrap();
	let b_before = fs::read(&b).unwrap();

	match steel.open(&b, "Wb") {
		Err(SteelError::AlreadyOpen(p)) => assert_eq!(p, a),
		other => panic!("expected AlreadyOpen, got {:?}", other.err()),
	}
	assert_eq!(fs::read(&b).unwrap(), b_before);

	// init is refused while a session is open too
	assert!(matches!(
		steel.init(&work.path().join("c.db")),
		Err(SteelError::AlreadyOpen(_))
	));

	steel.close("Wa").unwrap();
}

#[test]
fn generate_through_the_facade() {
	let home = tempdir().unwrap();
	let steel = steel_at(home.path());

	for _ in 0..1000 {
		let password = steel.generate(16).unwrap();
		assert_eq!(password.len(), 16);
		assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
	}

	assert!(matches!(steel.generate(5), Err(SteelError::InvalidArgument(_))));
}

#[test]
fn stale_lock_is_reported_and_removed() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let gone = work.path().join("x.db");
	let a = work.path().join("a.db");

	steel.init(&a).unwrap();
	steel.close("W1").unwrap();

	// A session is open on x.db, then the file disappears behind our back
	steel.init(&gone).unwrap();
	fs::remove_file(&gone).unwrap();

	let report = steel.list_status().unwrap();
	assert_eq!(report.removed_stale_lock, Some(gone.clone()));
	let x_status = report.databases.iter().find(|s| s.path == gone).unwrap();
	assert_eq!(x_status.state, DatabaseState::Missing);

	// The pruned entry stays gone and the lock no longer blocks anything
	let report = steel.list_status().unwrap();
	assert_eq!(report.removed_stale_lock, None);
	assert!(!report.databases.iter().any(|s| s.path == gone));

	steel.open(&a, "W1").unwrap();
	steel.close("W1").unwrap();
}

#[test]
fn record_operations_require_an_open_session() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	assert!(matches!(steel.list(), Err(SteelError::DatabaseNotOpen)));
	assert!(matches!(
		steel.add("t", "u", "p", "", ""),
		Err(SteelError::DatabaseNotOpen)
	));

	steel.init(&db).unwrap();
	steel.close("W1").unwrap();

	assert!(matches!(steel.get(1), Err(SteelError::DatabaseNotOpen)));
	assert!(matches!(steel.close("W1"), Err(SteelError::DatabaseNotOpen)));
}

#[test]
fn update_show_and_delete() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	steel.init(&db).unwrap();
	steel.add("mail", "alice", "p@ss", "m.example", "imap only").unwrap();
	steel.add("bank", "bob", "hunter2", "b.example", "").unwrap();

	steel.update(1, "passphrase", "n3w-p@ss").unwrap();
	assert_eq!(steel.show_field(1, "passphrase").unwrap().unwrap(), "n3w-p@ss");
	assert_eq!(steel.show_field(2, "user").unwrap().unwrap(), "bob");
	assert_eq!(steel.show_field(99, "user").unwrap(), None);

	assert!(matches!(
		steel.show_field(1, "title"),
		Err(SteelError::InvalidArgument(_))
	));
	assert!(matches!(
		steel.update(1, "guid", "x"),
		Err(SteelError::InvalidArgument(_))
	));

	let hits = steel.find("example").unwrap();
	assert_eq!(hits.len(), 2);

	steel.delete(1).unwrap();
	assert_eq!(steel.list().unwrap().len(), 1);
	assert!(steel.get(1).unwrap().is_none());

	// New records never reuse a deleted id
	assert_eq!(steel.add("forum", "carol", "pw", "", "").unwrap().id, 3);

	steel.close("W1").unwrap();
}

#[test]
fn backup_and_import() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");
	let copy = work.path().join("a.backup");
	let restored = work.path().join("restored.db");

	steel.init(&db).unwrap();
	steel.add("mail", "alice", "p@ss", "m.example", "").unwrap();

	// An open (plaintext) database must not be backed up
	assert!(matches!(steel.backup(&db, &copy), Err(SteelError::NotEncrypted(_))));

	steel.close("W1").unwrap();
	steel.backup(&db, &copy).unwrap();
	assert_eq!(fs::read(&db).unwrap(), fs::read(&copy).unwrap());

	assert!(matches!(steel.backup(&db, &copy), Err(SteelError::AlreadyExists(_))));

	steel.import_backup(&copy, &restored).unwrap();
	let report = steel.list_status().unwrap();
	assert!(report.databases.iter().any(|s| s.path == restored));

	steel.open(&restored, "W1").unwrap();
	assert_eq!(steel.get(1).unwrap().unwrap().title, "mail");
	steel.close("W1").unwrap();
}

#[test]
fn shredding_forgets_the_database() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let db = work.path().join("a.db");

	steel.init(&db).unwrap();
	steel.add("mail", "alice", "p@ss", "m.example", "").unwrap();
	steel.close("W1").unwrap();

	steel.remove_database(&db).unwrap();
	assert!(!db.exists());
	assert!(steel.list_status().unwrap().databases.is_empty());

	assert!(matches!(steel.remove_database(&db), Err(SteelError::NotFound(_))));
}

#[test]
fn status_reports_each_state() {
	let home = tempdir().unwrap();
	let work = tempdir().unwrap();
	let steel = steel_at(home.path());
	let closed = work.path().join("closed.db");
	let open = work.path().join("open.db");

	steel.init(&closed).unwrap();
	steel.close("W1").unwrap();
	steel.init(&open).unwrap();

	let report = steel.list_status().unwrap();
	assert_eq!(report.removed_stale_lock, None);

	let state_of = |path: &Path| {
		report
			.databases
			.iter()
			.find(|s| s.path == path)
			.map(|s| s.state)
			.unwrap()
	};
	assert_eq!(state_of(&closed), DatabaseState::Encrypted);
	assert_eq!(state_of(&open), DatabaseState::Open);

	steel.close("W1").unwrap();
}
