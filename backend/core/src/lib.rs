pub mod error;
pub mod message;
pub mod response;
pub mod traits;
pub mod types;

pub use error::{BotError, Speech};
pub use message::{Attachment, BotRequest, Message, MessageKind};
pub use response::{
    BotResponse, DeleteResponse, File, FileKind, FileResponse, FileSource, FormattingStyle,
    Indicator, LocationResponse, ResponseSettings, TextResponse,
};
pub use traits::{
    ChatStore, CommandPropertiesStore, CommandWaitingStore, PlatformSink, Stats, UserStore,
};
pub use types::{AccessLevel, AccessScope, Chat, CommandProperties, CommandWaiting, User};
