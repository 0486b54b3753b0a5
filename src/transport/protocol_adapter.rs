use super::{ProtocolAdapter, Transport};
use crate::messages::Message;
use anyhow::Result;

use log::{debug, trace};

impl<T, E> ProtocolAdapter for T
where
    T: Transport<Error = E>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn reset(&mut self) -> Result<()> {
        Ok(<T as Transport>::reset(self)?)
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        debug!("ProtocolAdapter::send: {:?}", msg.message_type());
        trace!("-> {:?}", msg);

        let mut out_buf = Vec::<u8>::with_capacity(msg.encoded_len());
        msg.encode(&mut out_buf)?;
        self.write(&out_buf, msg.write_timeout())?;

        Ok(())
    }

    fn as_mut_dyn(&mut self) -> &mut dyn ProtocolAdapter {
        self
    }

    fn handle(&mut self, msg: Message) -> Result<Message> {
        let read_timeout = msg.read_timeout();
        self.send(msg)?;

        let mut in_buf = Vec::<u8>::new();
        self.read(&mut in_buf, read_timeout)?;

        let out = Message::decode(&mut in_buf.as_slice())?;
        debug!(
            "ProtocolAdapter::handle: received {:?} ({} bytes)",
            out.message_type(),
            in_buf.len()
        );
        trace!("<- {:?}", out);
        Ok(out)
    }
}
