use crate::{
    chain::ChainClient,
    config::Deployments,
    error::Error,
    ethereum::{format_address, Address},
    process::{processes_for_mode, OperatingMode, ProcessKind, WorkerProcess},
    retry::{with_retry, RetryPolicy},
    state::WorkerState,
};
use chrono::Utc;
use ethnum::U256;
use log::{debug, error, info, warn};
use std::time::Duration;
use tai_vrf::{
    compute_fast_verify_params, envelope::encode_vrf_envelope, extends::AffineExtend, fast_verify,
    helper::compute_seed, ECVRF,
};
use tokio::sync::watch;

/// Delay before the next tick after a successful action
pub const FAST_FOLLOW_DELAY: Duration = Duration::from_secs(1);

/// Successful state change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Mock randomness was fulfilled
    Fulfilled,
    /// A loop was progressed
    Progressed,
}

/// Delay between ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Delay after an idle tick
    pub poll_interval: Duration,
    /// Delay after a tick that changed state
    pub fast_follow: Duration,
}

impl Pacing {
    /// Pacing with the default fast follow delay
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            fast_follow: FAST_FOLLOW_DELAY,
        }
    }

    /// Follow up quickly on cascading state changes, otherwise wait a poll interval
    pub fn next_delay(&self, action_taken: bool) -> Duration {
        if action_taken {
            self.fast_follow
        } else {
            self.poll_interval
        }
    }
}

/// Source of the proofs carried by VRF enveloped loop progressions
pub trait LoopProver {
    /// Public key words `[x, y]`, as registered on the loop contract
    fn public_key_words(&self) -> [U256; 2];

    /// Seed, proof, self check and envelope for a loop progression
    fn envelope(&self, contract: &Address, loop_id: U256, payload: &[u8]) -> Result<Vec<u8>, Error>;
}

impl LoopProver for ECVRF<'_> {
    fn public_key_words(&self) -> [U256; 2] {
        self.public_key().to_words()
    }

    fn envelope(
        &self,
        contract: &Address,
        loop_id: U256,
        payload: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let seed = compute_seed(contract, loop_id);
        let proof = self.prove(&seed)?;
        let params = compute_fast_verify_params(&proof.pk, &proof, &seed)?;
        if !fast_verify(&proof.pk, &proof, &seed, &params) {
            return Err(Error::EncodingMismatch("proof failed fast verification"));
        }
        Ok(encode_vrf_envelope(&proof, &params, payload))
    }
}

/// Poll loop driving every managed contract
pub struct Worker<C: ChainClient, P: LoopProver> {
    chain: C,
    prover: P,
    deployments: Deployments,
    processes: Vec<WorkerProcess>,
    mode: OperatingMode,
    retry: RetryPolicy,
    pacing: Pacing,
    state: WorkerState,
    publisher: watch::Sender<WorkerState>,
}

impl<C: ChainClient, P: LoopProver> Worker<C, P> {
    /// Create the worker and the receiving side of its state channel.
    /// The prover is always present, only VRF mode uses it.
    pub fn new(
        chain: C,
        prover: P,
        deployments: Deployments,
        mode: OperatingMode,
        poll_interval: Duration,
    ) -> (Self, watch::Receiver<WorkerState>) {
        let state = WorkerState::new();
        let (publisher, receiver) = watch::channel(state.clone());
        let worker = Self {
            chain,
            prover,
            processes: processes_for_mode(&deployments, mode),
            deployments,
            mode,
            retry: RetryPolicy::default(),
            pacing: Pacing::new(poll_interval),
            state,
            publisher,
        };
        (worker, receiver)
    }

    /// Managed processes in evaluation order
    pub fn processes(&self) -> &[WorkerProcess] {
        &self.processes
    }

    /// Current state
    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Startup checks, only a missing key registration in VRF mode is fatal
    pub async fn preflight(&self) -> Result<(), Error> {
        info!("Checking VRF status...");
        info!("  Mode: {}", self.mode);

        for (label, address) in [
            ("GAME_SETUP", self.deployments.game_setup),
            ("GAME_QUEUE", self.deployments.game_queue),
        ] {
            match self.chain.use_mock_vrf(&address).await {
                Ok(mock) => {
                    info!("  {} ({}): useMockVRF = {}", label, short(&address), mock);
                    if !mock && self.mode == OperatingMode::MockVrf {
                        warn!(
                            "  {} is NOT using mock VRF, its requests will not be fulfilled \
                             (vrf-cli enable-mock-vrf switches it)",
                            label
                        );
                    }
                }
                Err(err) => warn!("  {}: check failed, {}", label, err),
            }
        }

        if self.mode == OperatingMode::AutoLoopVrf {
            let gameplay = self.deployments.gameplay;
            let [pk_x, pk_y] = self.prover.public_key_words();
            info!("  Gameplay ({}): AutoLoop VRF enabled", short(&gameplay));
            info!("  VRF public key: x=0x{:064x} y=0x{:064x}", pk_x, pk_y);

            let sender = self.chain.sender();
            let registered = with_retry("Gameplay", &self.retry, || {
                self.chain.controller_key_registered(&gameplay, &sender)
            })
            .await?;
            if !registered {
                error!(
                    "  VRF key of {} is not registered on Gameplay, run vrf-cli register-key",
                    format_address(&sender)
                );
                return Err(Error::MissingKeyRegistration);
            }
            info!("  VRF key registered: yes");
        }
        Ok(())
    }

    /// Evaluate every process once, returns whether any state changed
    pub async fn tick(&mut self) -> bool {
        self.state.record_poll(Utc::now());
        self.publish();
        let mut action_taken = false;

        for index in 0..self.processes.len() {
            let process = self.processes[index].clone();
            match self.step(&process).await {
                Ok(Some(action)) => {
                    match action {
                        Action::Fulfilled => self.state.record_fulfillment(),
                        Action::Progressed => self.state.record_loop_progression(),
                    }
                    self.publish();
                    action_taken = true;
                }
                Ok(None) => {}
                Err(err) => error!("{}: {}", process.label, err),
            }
        }
        action_taken
    }

    /// Tick until shutdown is signalled, a closed channel counts as shutdown
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Entering main loop");
        while !*shutdown.borrow() {
            let action_taken = self.tick().await;
            let delay = self.pacing.next_delay(action_taken);
            debug!(
                "Sleeping {}ms (actionTaken={})",
                delay.as_millis(),
                action_taken
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Worker stopped");
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    async fn step(&self, process: &WorkerProcess) -> Result<Option<Action>, Error> {
        match process.kind {
            ProcessKind::MockVrf => self.fulfill_mock(process).await,
            ProcessKind::StandardLoop => self.progress_standard(process).await,
            ProcessKind::VrfLoop => self.progress_with_vrf(process).await,
        }
    }

    async fn fulfill_mock(&self, process: &WorkerProcess) -> Result<Option<Action>, Error> {
        let requests = self.chain.pending_mock_requests(&process.address).await?;
        let pending = requests.iter().filter(|r| **r > U256::ZERO).count();
        if pending == 0 {
            debug!("{}: no pending VRF requests", process.label);
            return Ok(None);
        }

        info!(
            "{}: {} pending VRF request(s), fulfilling...",
            process.label, pending
        );
        let receipt = with_retry(process.label, &self.retry, || {
            self.chain.fulfill_mock_randomness(&process.address)
        })
        .await?;
        info!(
            "{}: VRF fulfilled (block {}, tx {})",
            process.label, receipt.block_number, receipt.transaction_hash
        );
        Ok(Some(Action::Fulfilled))
    }

    async fn progress_standard(&self, process: &WorkerProcess) -> Result<Option<Action>, Error> {
        let (ready, payload) = self.chain.should_progress_loop(&process.address).await?;
        if !ready {
            debug!("{}: loop not ready", process.label);
            return Ok(None);
        }

        info!("{}: loop ready, progressing...", process.label);
        let receipt = with_retry(process.label, &self.retry, || {
            self.chain.progress_loop(&process.address, &payload)
        })
        .await?;
        info!(
            "{}: loop progressed (block {}, tx {})",
            process.label, receipt.block_number, receipt.transaction_hash
        );
        Ok(Some(Action::Progressed))
    }

    async fn progress_with_vrf(&self, process: &WorkerProcess) -> Result<Option<Action>, Error> {
        let (ready, payload) = self.chain.should_progress_loop(&process.address).await?;
        if !ready {
            debug!("{}: loop not ready (VRF mode)", process.label);
            return Ok(None);
        }

        let loop_id = self.chain.loop_id(&process.address).await?;
        info!(
            "{}: loop ready (VRF mode, loopID={}), generating proof...",
            process.label, loop_id
        );
        let envelope = self.prover.envelope(&process.address, loop_id, &payload)?;
        debug!(
            "{}: VRF proof generated, envelope size={} bytes",
            process.label,
            envelope.len()
        );

        let receipt = with_retry(process.label, &self.retry, || {
            self.chain.progress_loop(&process.address, &envelope)
        })
        .await?;
        info!(
            "{}: loop progressed with VRF (block {}, tx {})",
            process.label, receipt.block_number, receipt.transaction_hash
        );
        Ok(Some(Action::Progressed))
    }
}

/// `0x1234...abcd`
fn short(address: &Address) -> String {
    let full = format_address(address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
