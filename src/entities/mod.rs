pub mod admin_sessions;
pub mod admin_users;
pub mod fincas;
pub mod indices_satelitales;
pub mod pending_confirmations;
pub mod potreros;
pub mod proveedores;
pub mod regiones_umbral;
pub mod umbrales_indice;
pub mod usuarios;
