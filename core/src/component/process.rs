//! Supervision of the process backing a component.
//!
//! The spawned child is owned by a watch task, not by the component: the
//! component only keeps a shared view of `{pid, running}` plus a channel to
//! ask the task to kill the child. Whatever happens to the component, the
//! task is the one that reaps the process.

use std::{
	io,
	process::ExitStatus,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{
	process::{Child, Command},
	runtime::Handle,
	sync::oneshot,
};
use tracing::{debug, error, info, warn, Instrument};

use super::error::SpawnError;

#[derive(Debug, Default)]
struct ProcessState {
	pid: Option<u32>,
	running: bool,
	restart_on_exit: bool,
	stop_requested: bool,
	stop_tx: Option<oneshot::Sender<()>>,
}

#[derive(Debug, Default)]
pub(super) struct Process {
	state: Arc<Mutex<ProcessState>>,
}

fn lock(state: &Mutex<ProcessState>) -> MutexGuard<'_, ProcessState> {
	// Writes are plain stores, a poisoned lock can't hold a half-updated state
	state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shell-style splitting of an exec line.
pub(super) fn split_exec(exec: &str) -> Result<Vec<String>, SpawnError> {
	shlex::split(exec)
		.filter(|argv| !argv.is_empty())
		.ok_or_else(|| SpawnError::InvalidExec(exec.to_string()))
}

fn spawn(exec: &str, argv: &[String]) -> Result<Child, SpawnError> {
	let (program, args) = argv
		.split_first()
		.ok_or_else(|| SpawnError::InvalidExec(exec.to_string()))?;

	Command::new(program)
		.args(args)
		.spawn()
		.map_err(|source| SpawnError::Spawn {
			exec: exec.to_string(),
			source,
		})
}

enum Exit {
	Exited(io::Result<ExitStatus>),
	Requested,
}

impl Process {
	pub fn pid(&self) -> Option<u32> {
		lock(&self.state).pid
	}

	pub fn is_running(&self) -> bool {
		lock(&self.state).running
	}

	pub fn restart_on_exit(&self) -> bool {
		lock(&self.state).restart_on_exit
	}

	pub fn set_restart_on_exit(&self, restart: bool) {
		lock(&self.state).restart_on_exit = restart;
	}

	/// Spawns the child and hands it to a watch task on the current runtime.
	/// A process that is already running is left alone.
	pub fn start(&self, name: &str, exec: &str) -> Result<(), SpawnError> {
		let runtime = Handle::try_current().map_err(|_| SpawnError::NoRuntime)?;

		let mut state = lock(&self.state);
		if state.running {
			debug!(%name, pid = ?state.pid, "Component already running;");
			return Ok(());
		}

		let argv = split_exec(exec)?;
		let child = spawn(exec, &argv)?;
		let (stop_tx, stop_rx) = oneshot::channel();

		state.pid = child.id();
		state.running = true;
		state.stop_requested = false;
		state.stop_tx = Some(stop_tx);

		info!(%name, pid = ?state.pid, %exec, "Started component;");
		drop(state);

		let span = tracing::info_span!("component", %name);
		runtime.spawn(
			watch_child(
				Arc::clone(&self.state),
				exec.to_string(),
				argv,
				child,
				stop_rx,
			)
			.instrument(span),
		);

		Ok(())
	}

	/// Asks the watch task to kill the child and returns right away. An exit
	/// caused by this never triggers a restart.
	pub fn stop(&self) {
		let mut state = lock(&self.state);
		state.stop_requested = true;
		if let Some(stop_tx) = state.stop_tx.take() {
			debug!(pid = ?state.pid, "Requesting component stop;");
			// The task may have just seen the child exit on its own
			stop_tx.send(()).ok();
		}
	}
}

impl Drop for Process {
	fn drop(&mut self) {
		self.stop();
	}
}

async fn watch_child(
	state: Arc<Mutex<ProcessState>>,
	exec: String,
	argv: Vec<String>,
	mut child: Child,
	mut stop_rx: oneshot::Receiver<()>,
) {
	loop {
		let exit = tokio::select! {
			status = child.wait() => Exit::Exited(status),
			_ = &mut stop_rx => Exit::Requested,
		};

		let requested = match exit {
			Exit::Exited(Ok(status)) => {
				info!(%status, "Component process exited;");
				false
			}
			Exit::Exited(Err(e)) => {
				error!(?e, "Failed to wait on component process;");
				false
			}
			Exit::Requested => {
				if let Err(e) = child.start_kill() {
					warn!(?e, "Failed to kill component process;");
				}
				match child.wait().await {
					Ok(status) => info!(%status, "Component process stopped;"),
					Err(e) => error!(?e, "Failed to reap stopped component process;"),
				}
				true
			}
		};

		let mut guard = lock(&state);
		guard.pid = None;
		guard.running = false;
		guard.stop_tx = None;

		if requested || guard.stop_requested || !guard.restart_on_exit {
			return;
		}

		match spawn(&exec, &argv) {
			Ok(new_child) => {
				let (stop_tx, new_stop_rx) = oneshot::channel();
				guard.pid = new_child.id();
				guard.running = true;
				guard.stop_tx = Some(stop_tx);
				info!(pid = ?guard.pid, "Restarted component process;");

				child = new_child;
				stop_rx = new_stop_rx;
			}
			Err(e) => {
				error!(?e, "Failed to restart component process;");
				return;
			}
		}
	}
}
