pub mod diagrams;
pub mod inventory;
pub mod m365;
pub mod remote_clients;
