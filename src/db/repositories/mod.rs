pub mod admin_user;
pub mod confirmation;
pub mod farm;
pub mod indice;
pub mod provider;
pub mod region;
pub mod session;
pub mod threshold;
pub mod usuario;
