pub mod m365;
