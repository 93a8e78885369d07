mod shell;
pub use shell::Shell;

mod login;
pub use login::Login;

mod home;
pub use home::Home;

mod users;
pub use users::Users;

mod profile;
pub use profile::Profile;

mod chat;
pub use chat::Chat;
