mod add_todo;
mod login;
mod settings;
mod todo_list;
mod user_list;

pub use add_todo::AddTodoView;
pub use login::LoginView;
pub use settings::SettingsView;
pub use todo_list::TodoListView;
pub use user_list::UserListView;
