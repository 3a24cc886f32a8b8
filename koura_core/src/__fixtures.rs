use crate::Context;
use crate::Entity;
use crate::Object;

pub fn greeting_context() -> Context<'static> {
	Context::new().with_entity("what", "world")
}

pub fn numbers_context() -> Context<'static> {
	Context::new().with_entity("items", vec![1, 2, 3])
}

pub fn users_context() -> Context<'static> {
	let users = vec![
		Object::new().with("name", "ada").with("role", "admin"),
		Object::new().with("name", "grace").with("role", ""),
	];

	Context::new()
		.with_entity("users", users)
		.with_entity("empty", Vec::<Entity>::new())
		.with_entity("obj", Object::new().with("a", "hi"))
		.with_entity("title", "Team")
		.with_entity("count", 2)
}
