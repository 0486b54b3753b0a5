//! A device client: a transport, a vendor profile and a UI handler.
//!
//! Every exchange goes through [`HardwareClient::call`], which answers the
//! device's interactive requests (button, PIN, passphrase, word, entropy)
//! through the [`DeviceHandler`] until the device sends a final response.

use rand::RngCore;
use tracing::{debug, error, info, instrument};

use crate::device::{open_transport, ConnectOptions, DeviceProfile};
use crate::error::{ClientError, Result};
use crate::handler::{CancelHandle, DeviceHandler};
use crate::messages::{
    self, ButtonRequest, FailureType, Features, InputScriptType, Message, PinMatrixRequest,
};
use crate::prompts::{self, PromptOverride};
use crate::transport::ProtocolAdapter;

const ENTROPY_LEN: usize = 32;

/// Answers device requests on behalf of the user.
struct Callbacks<'c, H> {
    handler: &'c H,
    profile: &'c DeviceProfile,
    prompt_override: Option<PromptOverride>,
    cancel: &'c CancelHandle,
}

impl<H: DeviceHandler> Callbacks<'_, H> {
    fn respond(&self, msg: &Message) -> Option<Message> {
        match msg {
            Message::ButtonRequest(req) => Some(self.on_button_request(req)),
            Message::PinMatrixRequest(req) => Some(self.on_pin_matrix_request(req)),
            Message::PassphraseRequest(_) => Some(self.on_passphrase_request()),
            Message::WordRequest(_) => Some(self.on_word_request()),
            Message::EntropyRequest(_) => Some(Self::on_entropy_request()),
            _ => None,
        }
    }

    fn on_button_request(&self, req: &ButtonRequest) -> Message {
        debug!(code = ?req.code, "ButtonRequest");
        let prompt = prompts::button_prompt(req.code, self.prompt_override, self.profile.name);
        // Cancellation follows the device's code, not the prompt override.
        let cancellable = self.profile.supports_cancel && prompts::button_cancellable(req.code);

        self.handler
            .show_message(&prompt, cancellable.then(|| self.cancel.clone()));

        if cancellable && self.cancel.take() {
            info!("Confirmation cancelled from the host");
            messages::Cancel {}.into()
        } else {
            messages::ButtonAck {}.into()
        }
    }

    fn on_pin_matrix_request(&self, req: &PinMatrixRequest) -> Message {
        let prompt = prompts::pin_prompt(req.r#type, self.profile.name);
        match self.handler.get_pin(&prompt) {
            Some(pin) if !pin.is_empty() => messages::PinMatrixAck { pin }.into(),
            _ => {
                info!("PIN entry cancelled");
                messages::Cancel {}.into()
            }
        }
    }

    fn on_passphrase_request(&self) -> Message {
        let prompt = prompts::passphrase_prompt(self.profile.name);
        // An empty passphrase is a valid choice; only a dismissed prompt cancels.
        match self.handler.get_passphrase(&prompt) {
            Some(passphrase) => messages::PassphraseAck { passphrase }.into(),
            None => {
                info!("Passphrase entry cancelled");
                messages::Cancel {}.into()
            }
        }
    }

    fn on_word_request(&self) -> Message {
        match self.handler.get_word(prompts::WORD_PROMPT) {
            Some(word) => messages::WordAck { word }.into(),
            None => {
                info!("Word entry cancelled");
                messages::Cancel {}.into()
            }
        }
    }

    fn on_entropy_request() -> Message {
        let mut entropy = vec![0u8; ENTROPY_LEN];
        rand::thread_rng().fill_bytes(&mut entropy);
        debug!("Supplying {} bytes of host entropy", ENTROPY_LEN);
        messages::EntropyAck {
            entropy: Some(entropy),
        }
        .into()
    }
}

/// Marks the client bad when a raw exchange fails.
struct RawChannel<'a> {
    adapter: &'a mut (dyn ProtocolAdapter + Send),
    bad: &'a mut bool,
    device: &'static str,
}

impl RawChannel<'_> {
    fn mark_bad(&mut self, e: anyhow::Error) -> anyhow::Error {
        error!("Marking {} client bad: {:#}", self.device, e);
        *self.bad = true;
        e
    }
}

impl ProtocolAdapter for RawChannel<'_> {
    fn reset(&mut self) -> anyhow::Result<()> {
        self.adapter.reset().map_err(|e| self.mark_bad(e))
    }

    fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        self.adapter.send(msg).map_err(|e| self.mark_bad(e))
    }

    fn handle(&mut self, msg: Message) -> anyhow::Result<Message> {
        self.adapter.handle(msg).map_err(|e| self.mark_bad(e))
    }

    fn as_mut_dyn(&mut self) -> &mut dyn ProtocolAdapter {
        self
    }
}

pub struct HardwareClient<H: DeviceHandler> {
    adapter: Box<dyn ProtocolAdapter + Send>,
    profile: DeviceProfile,
    handler: H,
    features: Option<Features>,
    bad: bool,
    msg_code_override: Option<PromptOverride>,
    cancel: CancelHandle,
}

impl<H: DeviceHandler> HardwareClient<H> {
    pub fn new(
        adapter: Box<dyn ProtocolAdapter + Send>,
        profile: DeviceProfile,
        handler: H,
    ) -> Self {
        Self {
            adapter,
            profile,
            handler,
            features: None,
            bad: false,
            msg_code_override: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Opens the device selected by `options` and loads its features.
    pub fn connect(options: &ConnectOptions, handler: H) -> anyhow::Result<Self> {
        let adapter = open_transport(options)?;
        let mut client = Self::new(adapter, *options.vendor.profile(), handler);
        client.init_device()?;
        Ok(client)
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Set once a transport exchange has failed. A bad client should be
    /// dropped and the device reopened.
    pub fn is_bad(&self) -> bool {
        self.bad
    }

    /// Handle the UI can trigger to cancel a transaction confirmation.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn features(&self) -> Option<&Features> {
        self.features.as_ref()
    }

    /// One request/response exchange, without answering device requests.
    pub fn call_raw(&mut self, msg: Message) -> Result<Message> {
        let mut raw = RawChannel {
            adapter: &mut *self.adapter,
            bad: &mut self.bad,
            device: self.profile.name,
        };
        raw.handle(msg).map_err(ClientError::Transport)
    }

    /// Sends `msg`, answering interactive requests until the device sends a
    /// final response. A `Failure` response is returned as an error.
    #[instrument(level = "debug", skip(self), fields(device = self.profile.name))]
    pub fn call(&mut self, msg: Message) -> Result<Message> {
        // A cancel left over from an earlier exchange must not abort this one.
        self.cancel.take();

        let callbacks = Callbacks {
            handler: &self.handler,
            profile: &self.profile,
            prompt_override: self.msg_code_override,
            cancel: &self.cancel,
        };
        let mut raw = RawChannel {
            adapter: &mut *self.adapter,
            bad: &mut self.bad,
            device: self.profile.name,
        };
        let mut respond =
            |m: &Message| -> anyhow::Result<Option<Message>> { Ok(callbacks.respond(m)) };

        let response = raw
            .with_mut_handler(&mut respond)
            .handle(msg)
            .map_err(ClientError::Transport)?;

        match response {
            // Match on the raw code: prost's getter folds unknown codes into
            // the enum default.
            Message::Failure(failure) => match failure.code.and_then(FailureType::from_i32) {
                Some(FailureType::ActionCancelled | FailureType::PinCancelled) => {
                    Err(ClientError::Cancelled)
                }
                _ => Err(ClientError::Failure {
                    code: failure.code,
                    message: failure.message.unwrap_or_default(),
                }),
            },
            other => Ok(other),
        }
    }

    fn call_expect_success(&mut self, msg: Message) -> Result<String> {
        match self.call(msg)? {
            Message::Success(success) => Ok(success.message().to_owned()),
            other => Err(ClientError::UnexpectedMessage(other.message_type())),
        }
    }

    fn store_features(&mut self, response: Message) -> Result<&Features> {
        match response {
            Message::Features(features) => {
                info!(
                    "{} firmware {}.{}.{}, label {:?}",
                    self.profile.name,
                    features.major_version(),
                    features.minor_version(),
                    features.patch_version(),
                    features.label
                );
                Ok(self.features.insert(features))
            }
            other => Err(ClientError::UnexpectedMessage(other.message_type())),
        }
    }

    /// Starts a new session and caches the device's features.
    pub fn init_device(&mut self) -> Result<&Features> {
        let response = self.call(messages::Initialize {}.into())?;
        self.store_features(response)
    }

    /// Re-reads the features without resetting the session.
    pub fn refresh_features(&mut self) -> Result<&Features> {
        let response = self.call(messages::GetFeatures {}.into())?;
        self.store_features(response)
    }

    /// Runs `f` with the button prompt overridden. The override is cleared
    /// whether or not `f` succeeds.
    fn with_prompt_override<T>(
        &mut self,
        prompt_override: PromptOverride,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.msg_code_override = Some(prompt_override);
        let result = f(self);
        self.msg_code_override = None;
        result
    }

    pub fn apply_settings(&mut self, settings: messages::ApplySettings) -> Result<()> {
        self.call_expect_success(settings.into())?;
        self.init_device()?;
        Ok(())
    }

    pub fn change_label(&mut self, label: &str) -> Result<()> {
        let settings = messages::ApplySettings {
            label: Some(label.to_owned()),
            ..Default::default()
        };
        self.with_prompt_override(PromptOverride::Label, |client| {
            client.apply_settings(settings)
        })
    }

    pub fn change_pin(&mut self, remove: bool) -> Result<()> {
        self.call_expect_success(
            messages::ChangePin {
                remove: Some(remove),
            }
            .into(),
        )?;
        self.init_device()?;
        Ok(())
    }

    /// Sets, changes or removes the PIN with the matching confirmation prompt.
    pub fn set_pin(&mut self, remove: bool) -> Result<()> {
        let prompt_override = if remove {
            PromptOverride::RemovePin
        } else {
            PromptOverride::ChangePin
        };
        self.with_prompt_override(prompt_override, |client| client.change_pin(remove))
    }

    pub fn firmware_version(&self) -> Result<(u32, u32, u32)> {
        let f = self.features.as_ref().ok_or(ClientError::FeaturesUnavailable)?;
        Ok((f.major_version(), f.minor_version(), f.patch_version()))
    }

    pub fn atleast_version(&self, major: u32, minor: u32, patch: u32) -> Result<bool> {
        Ok(self.firmware_version()? >= (major, minor, patch))
    }

    /// Whether the firmware meets the profile's minimum version.
    pub fn firmware_supported(&self) -> Result<bool> {
        let (major, minor, patch) = self.profile.minimum_firmware;
        self.atleast_version(major, minor, patch)
    }

    pub fn ping(&mut self, message: &str, button_protection: bool) -> Result<String> {
        self.call_expect_success(
            messages::Ping {
                message: Some(message.to_owned()),
                button_protection: Some(button_protection),
                ..Default::default()
            }
            .into(),
        )
    }

    /// Pings the device unless the client is already known to be bad.
    pub fn has_usable_connection(&mut self) -> bool {
        if self.bad {
            return false;
        }
        match self.ping("", false) {
            Ok(_) => true,
            Err(e) => {
                debug!("Ping failed: {}", e);
                false
            }
        }
    }

    pub fn get_address(
        &mut self,
        path: &[u32],
        coin_name: &str,
        show_display: bool,
        script_type: InputScriptType,
    ) -> Result<String> {
        let mut request = messages::GetAddress {
            address_n: path.to_vec(),
            coin_name: Some(coin_name.to_owned()),
            show_display: Some(show_display),
            ..Default::default()
        };
        request.set_script_type(script_type);

        match self.call(request.into())? {
            Message::Address(address) => Ok(address.address),
            other => Err(ClientError::UnexpectedMessage(other.message_type())),
        }
    }

    /// Forgets the cached PIN and passphrase, then starts a new session.
    pub fn clear_session(&mut self) -> Result<()> {
        self.call_expect_success(messages::ClearSession {}.into())?;
        self.init_device()?;
        Ok(())
    }

    pub fn wipe_device(&mut self) -> Result<()> {
        self.call_expect_success(messages::WipeDevice {}.into())?;
        self.init_device()?;
        Ok(())
    }

    /// Generates a new seed on the device, mixing in host entropy.
    pub fn reset_device(&mut self, request: messages::ResetDevice) -> Result<()> {
        self.call_expect_success(request.into())?;
        self.init_device()?;
        Ok(())
    }

    /// Restores a seed by entering its words one at a time.
    pub fn recovery_device(&mut self, request: messages::RecoveryDevice) -> Result<()> {
        self.call_expect_success(request.into())?;
        self.init_device()?;
        Ok(())
    }
}
