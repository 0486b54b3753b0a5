pub mod framing;
pub mod hid;
pub mod protocol_adapter;
pub mod usb;

pub use hid::*;
pub use protocol_adapter::*;
pub use usb::*;

use crate::messages::Message;
use anyhow::Result;
use core::time::Duration;
use log::debug;

pub trait Transport {
    type Error: std::error::Error;
    fn write(&mut self, msg: &[u8], timeout: Duration) -> Result<usize, Self::Error>;
    fn read(&mut self, buf: &mut Vec<u8>, timeout: Duration) -> Result<(), Self::Error>;
    fn reset(&mut self) -> Result<(), Self::Error>;
}

pub trait ProtocolAdapter {
    fn reset(&mut self) -> Result<()>;
    fn send(&mut self, msg: Message) -> Result<()>;
    /// Sends `msg` and returns the device's next message.
    fn handle(&mut self, msg: Message) -> Result<Message>;
    fn as_mut_dyn(&mut self) -> &mut dyn ProtocolAdapter;
    /// Stacks `handler` on this adapter. Each response is offered to the
    /// handler; a returned message is sent back to the device and the loop
    /// continues, `None` ends the exchange with that response.
    fn with_mut_handler<'a: 'b, 'b>(
        &'a mut self,
        handler: &'b mut MessageHandlerMut<'b>,
    ) -> Box<dyn ProtocolAdapter + 'b> {
        Box::from(MessageHandlerMutStack {
            parent_adapter: self.as_mut_dyn(),
            handler,
        })
    }
}

pub type MessageHandlerMut<'a> = dyn FnMut(&Message) -> Result<Option<Message>> + 'a;

pub struct MessageHandlerMutStack<'a, 'b> {
    parent_adapter: &'a mut dyn ProtocolAdapter,
    handler: &'b mut MessageHandlerMut<'b>,
}

impl ProtocolAdapter for MessageHandlerMutStack<'_, '_> {
    fn reset(&mut self) -> Result<()> {
        self.parent_adapter.reset()
    }
    fn send(&mut self, msg: Message) -> Result<()> {
        self.parent_adapter.send(msg)
    }
    fn handle(&mut self, msg: Message) -> Result<Message> {
        let mut msg = msg;
        loop {
            let msg_out = self.parent_adapter.handle(msg)?;
            match (self.handler)(&msg_out)? {
                Some(x) => {
                    debug!(
                        "MessageHandlerMutStack::handle: {:?} answered with {:?}",
                        msg_out.message_type(),
                        x.message_type()
                    );
                    msg = x;
                }
                None => return Ok(msg_out),
            }
        }
    }
    fn as_mut_dyn(&mut self) -> &mut dyn ProtocolAdapter {
        self
    }
}
