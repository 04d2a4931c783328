pub mod client;
pub mod level;
pub mod report;
pub mod space;
pub mod ticket;

pub use client::{ActiveClient, Client, ClientData, ClientPatch};
pub use level::Level;
pub use report::{NewReport, Report, ReportTimestamp};
pub use space::{Space, SpacePatch};
pub use ticket::{Ticket, TicketClient, TicketSpace, TICKET_TAG};
