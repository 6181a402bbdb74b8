//! Registry integration tests
//!
//! Scan, cache and monitor a scratch component directory the way the daemon
//! does on start-up.

use std::{
	fs::{self, File},
	path::{Path, PathBuf},
	time::{Duration, SystemTime},
};

use ibus_core::{Registry, RegistryConfig};
use tempfile::TempDir;
use tokio::time::timeout;
use tracing_test::traced_test;

const ANTHY: &str = "<component>
	<name>org.freedesktop.IBus.Anthy</name>
	<exec>/usr/libexec/ibus-engine-anthy --ibus</exec>
	<engines>
		<engine><name>anthy</name><language>ja</language><rank>99</rank></engine>
	</engines>
</component>";

const SIMPLE: &str = "<component>
	<name>org.freedesktop.IBus.Simple</name>
	<exec>/usr/libexec/ibus-engine-simple</exec>
	<engines>
		<engine><name>xkb:us::eng</name><language>en</language></engine>
	</engines>
</component>";

struct Scratch {
	root: TempDir,
	config: RegistryConfig,
}

impl Scratch {
	fn new() -> Self {
		let root = TempDir::new().unwrap();
		let components = root.path().join("component");
		fs::create_dir(&components).unwrap();
		fs::write(components.join("anthy.xml"), ANTHY).unwrap();
		fs::write(components.join("simple.xml"), SIMPLE).unwrap();

		let config = RegistryConfig {
			component_dirs: vec![components],
			cache_file: root.path().join("cache/ibus/bus/registry"),
			quiet_period: Duration::from_millis(300),
		};

		Self {
			root,
			config,
		}
	}

	fn descriptor(&self, name: &str) -> PathBuf {
		self.config.component_dirs[0].join(name)
	}
}

fn set_mtime(path: &Path, secs: u64) {
	File::open(path)
		.unwrap()
		.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
		.unwrap();
}

#[test]
#[traced_test]
fn cache_round_trip_is_idempotent() {
	let scratch = Scratch::new();

	let registry = Registry::load_or_refresh(&scratch.config);
	assert_eq!(registry.components().len(), 2);
	let first = fs::read(&scratch.config.cache_file).unwrap();

	let mut reloaded = Registry::new();
	assert!(reloaded.load_cache(&scratch.config.cache_file).unwrap());
	assert_eq!(reloaded, registry);

	reloaded.save_cache(&scratch.config.cache_file).unwrap();
	assert_eq!(fs::read(&scratch.config.cache_file).unwrap(), first);
}

#[test]
#[traced_test]
fn fresh_cache_is_used_as_is() {
	let scratch = Scratch::new();
	let scanned = Registry::load_or_refresh(&scratch.config);

	// A descriptor the cache doesn't know about, without touching any mtime
	// the cache recorded, stays invisible
	let dir = &scratch.config.component_dirs[0];
	let dir_mtime = scanned.observed_paths()[0].mtime();
	fs::write(dir.join("extra.xml"), SIMPLE.replace("Simple", "Extra")).unwrap();
	set_mtime(dir, u64::try_from(dir_mtime).unwrap());

	let cached = Registry::load_or_refresh(&scratch.config);
	assert_eq!(cached, scanned);
	assert!(logs_contain("Registry cache is current;"));
}

#[test]
#[traced_test]
fn staleness_never_heals_until_reload() {
	let scratch = Scratch::new();
	let anthy = scratch.descriptor("anthy.xml");
	set_mtime(&anthy, 1_600_000_000);

	let registry = Registry::load_or_refresh(&scratch.config);
	assert!(!registry.check_modification());

	set_mtime(&anthy, 1_600_000_060);
	assert!(registry.check_modification());
	assert!(registry.check_modification());

	let mut cached = Registry::new();
	assert!(cached.load_cache(&scratch.config.cache_file).unwrap());
	assert!(cached.check_modification());

	let refreshed = Registry::load_or_refresh(&scratch.config);
	assert!(logs_contain("Registry cache is stale, rescanning;"));
	assert!(!refreshed.check_modification());
}

#[test]
#[traced_test]
fn corrupt_cache_leads_to_rescan() {
	let scratch = Scratch::new();
	fs::create_dir_all(scratch.config.cache_file.parent().unwrap()).unwrap();
	fs::write(&scratch.config.cache_file, b"IBUS\x00\x01\x00\x00not msgpack").unwrap();

	let registry = Registry::load_or_refresh(&scratch.config);

	assert_eq!(registry.components().len(), 2);
	assert!(logs_contain("Failed to load registry cache, rescanning;"));

	let mut reloaded = Registry::new();
	assert!(reloaded.load_cache(&scratch.config.cache_file).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[traced_test]
async fn burst_of_changes_is_announced_once() {
	let scratch = Scratch::new();
	let mut registry = Registry::load_or_refresh(&scratch.config);
	let mut changes = registry.subscribe_changes();

	registry
		.start_monitor_changes_with(scratch.config.quiet_period)
		.unwrap();
	assert!(registry.is_monitoring());
	assert!(!registry.is_dirty());

	let dir = scratch.config.component_dirs[0].clone();
	for i in 0..50 {
		fs::write(dir.join(format!("burst-{i}.xml")), SIMPLE).unwrap();
	}

	timeout(Duration::from_secs(10), changes.recv())
		.await
		.expect("no change announced")
		.unwrap();
	assert!(registry.is_dirty());

	// More writes after the announcement go unheard
	fs::write(dir.join("late.xml"), SIMPLE).unwrap();
	tokio::time::sleep(scratch.config.quiet_period * 3).await;
	assert!(changes.try_recv().is_err());
	assert!(!registry.is_monitoring());

	registry.clear_dirty();
	assert!(!registry.is_dirty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[traced_test]
async fn stopped_monitor_stays_quiet() {
	let scratch = Scratch::new();
	let mut registry = Registry::load_or_refresh(&scratch.config);
	let mut changes = registry.subscribe_changes();

	registry
		.start_monitor_changes_with(scratch.config.quiet_period)
		.unwrap();
	registry.stop_monitor_changes();

	fs::write(scratch.descriptor("anthy.xml"), ANTHY).unwrap();
	tokio::time::sleep(scratch.config.quiet_period * 3).await;

	assert!(changes.try_recv().is_err());
	assert!(!registry.is_dirty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[traced_test]
async fn missing_observed_path_only_hears_about_itself() {
	let scratch = Scratch::new();
	let home = scratch.root.path().join("home");
	fs::create_dir(&home).unwrap();
	let dictionary = home.join(".anthy");

	fs::write(
		scratch.descriptor("anthy.xml"),
		ANTHY.replace(
			"</exec>",
			&format!(
				"</exec>\n\t<observed-paths><path>{}</path></observed-paths>",
				dictionary.display()
			),
		),
	)
	.unwrap();

	let mut registry = Registry::load_or_refresh(&scratch.config);
	let mut changes = registry.subscribe_changes();
	registry
		.start_monitor_changes_with(scratch.config.quiet_period)
		.unwrap();

	fs::write(home.join("unrelated.txt"), "noise").unwrap();
	fs::create_dir(home.join(".anthy-backup")).unwrap();
	tokio::time::sleep(scratch.config.quiet_period * 3).await;

	assert!(changes.try_recv().is_err());
	assert!(!registry.is_dirty());
	assert!(registry.is_monitoring());
	assert!(!registry.check_modification());

	fs::create_dir(&dictionary).unwrap();

	timeout(Duration::from_secs(10), changes.recv())
		.await
		.expect("creating the observed path went unheard")
		.unwrap();
	assert!(registry.is_dirty());
	assert!(registry.check_modification());
}
