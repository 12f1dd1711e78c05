//! Static registration table: host operation → ordered lifecycle steps.

use crate::application::ports::{MachineGateway, MachineStore, MessageSink, SuffixGenerator};
use crate::application::services::machine::MachineController;
use crate::domain::ProviderError;

/// Host-level operations that mutate the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Up,
    Halt,
    Start,
    Reload,
    Destroy,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Up => "up",
            Operation::Halt => "halt",
            Operation::Start => "start",
            Operation::Reload => "reload",
            Operation::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CheckBackend,
    Up,
    Halt,
    Start,
    WaitForSsh,
    Provision,
    Destroy,
}

/// Steps executed for `op`, in order.
#[must_use]
pub const fn steps(op: Operation) -> &'static [Step] {
    match op {
        Operation::Up => &[Step::CheckBackend, Step::Up],
        Operation::Halt => &[Step::Halt],
        Operation::Start => &[Step::CheckBackend, Step::Start, Step::WaitForSsh],
        Operation::Reload => &[
            Step::CheckBackend,
            Step::Halt,
            Step::Start,
            Step::WaitForSsh,
            Step::Provision,
        ],
        Operation::Destroy => &[Step::Destroy],
    }
}

/// Run every step registered for `op`. The first failure aborts the rest.
///
/// # Errors
///
/// Returns the failing step's error.
pub async fn run_operation<G, S, N, U>(
    controller: &mut MachineController<G, S, N, U>,
    op: Operation,
) -> Result<(), ProviderError>
where
    G: MachineGateway,
    S: MachineStore,
    N: SuffixGenerator,
    U: MessageSink,
{
    for step in steps(op) {
        tracing::debug!(?op, ?step, "running step");
        run_step(controller, *step).await?;
    }
    Ok(())
}

async fn run_step<G, S, N, U>(
    controller: &mut MachineController<G, S, N, U>,
    step: Step,
) -> Result<(), ProviderError>
where
    G: MachineGateway,
    S: MachineStore,
    N: SuffixGenerator,
    U: MessageSink,
{
    match step {
        Step::CheckBackend => controller.check_backend().await,
        Step::Up => controller.up().await.map(|_| ()),
        Step::Halt => controller.halt().await,
        Step::Start => controller.start().await,
        Step::WaitForSsh => {
            let id = controller
                .identity()
                .await?
                .ok_or_else(|| ProviderError::InvalidMachineIdentity {
                    operation: "wait for ssh".to_string(),
                })?;
            controller.wait_for_ssh(&id).await
        }
        Step::Provision => {
            controller
                .ui()
                .info("Provisioning is handled by the host; nothing to do here.");
            Ok(())
        }
        Step::Destroy => controller.destroy().await,
    }
}
