/// Declares the `MessageType` id table and the `Message` enum over the
/// payload structs in `protos`, together with the per-variant dispatch the
/// codec needs.
macro_rules! wire_message {
    ($($name:ident = $id:literal),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum MessageType {
            $($name = $id),*
        }

        impl MessageType {
            pub fn from_u16(id: u16) -> Option<Self> {
                match id {
                    $($id => Some(MessageType::$name),)*
                    _ => None,
                }
            }

            pub fn id(self) -> u16 {
                self as u16
            }
        }

        #[derive(Clone, PartialEq)]
        pub enum Message {
            $($name($name)),*
        }

        impl Message {
            pub fn message_type(&self) -> MessageType {
                match self {
                    $(Message::$name(_) => MessageType::$name),*
                }
            }

            fn payload_len(&self) -> usize {
                match self {
                    $(Message::$name(m) => ::prost::Message::encoded_len(m)),*
                }
            }

            fn encode_payload(&self, buf: &mut Vec<u8>) -> Result<(), ::prost::EncodeError> {
                match self {
                    $(Message::$name(m) => ::prost::Message::encode(m, buf)),*
                }
            }

            fn decode_payload(
                message_type: MessageType,
                payload: &[u8],
            ) -> Result<Self, ::prost::DecodeError> {
                Ok(match message_type {
                    $(MessageType::$name => {
                        Message::$name(<$name as ::prost::Message>::decode(payload)?)
                    })*
                })
            }

            fn fmt_payload(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self {
                    $(Message::$name(m) => ::core::fmt::Debug::fmt(m, f)),*
                }
            }
        }

        $(
            impl From<$name> for Message {
                fn from(x: $name) -> Self {
                    Message::$name(x)
                }
            }
        )*
    };
}

pub(crate) use wire_message;
