// vim: tw=80
//! What happens to calls that match no rule
#![deny(warnings)]

use fakeit::*;

#[derive(Clone, Debug, PartialEq)]
struct Token(u64);

#[test]
fn default_values() {
    let count = Member::method("Service", "count").returns::<u32>();
    let name = Member::method("Service", "name").returns::<String>();
    let items = Member::method("Service", "items").returns::<Vec<u8>>();
    let fake = Fake::dynamic("Service");
    assert_eq!(0, fake.call_as::<u32>(&count, values![]).unwrap());
    assert_eq!("", fake.call_as::<String>(&name, values![]).unwrap());
    assert!(fake.call_as::<Vec<u8>>(&items, values![]).unwrap().is_empty());
}

/// A rule added after a defaulted call only affects later calls.
#[test]
fn rule_added_after_a_default_call() {
    let get_count = Member::method("Service", "get_count").returns::<i32>();
    let fake = Fake::dynamic("Service");
    assert_eq!(0, fake.call_as::<i32>(&get_count, values![]).unwrap());
    assert_eq!(1, fake.recorded_calls().len());
    fake.configure(&fake.call_to(&get_count)).unwrap()
        .returns(42i32).unwrap();
    assert_eq!(42, fake.call_as::<i32>(&get_count, values![]).unwrap());
    let calls = fake.recorded_calls();
    assert_eq!(2, calls.len());
    assert!(calls[0].sequence() < calls[1].sequence());
    assert_eq!(Some(&0), calls[0].return_value::<i32>());
    assert_eq!(Some(&42), calls[1].return_value::<i32>());
}

#[test]
fn unit_member() {
    let close = Member::method("Service", "close");
    let fake = Fake::dynamic("Service");
    assert!(fake.call(&close, values![]).unwrap().is_none());
}

#[test]
fn no_default_value() {
    let token = Member::method("Service", "token")
        .returns_without_default::<Token>();
    let fake = Fake::dynamic("Service");
    let e = fake.call(&token, values![]).unwrap_err();
    assert!(matches!(e,
        DispatchError::Configuration(ConfigurationError::NoDefaultValue{..})));
    // The failed call is still recorded
    let calls = fake.recorded_calls();
    assert_eq!(1, calls.len());
    assert!(matches!(calls[0].outcome(), CallOutcome::Failed(_)));
}

#[test]
fn does_nothing_returns_default() {
    let count = Member::method("Service", "count").returns::<u32>();
    let fake = Fake::dynamic("Service");
    fake.configure(&fake.call_to(&count)).unwrap()
        .returns(5u32).unwrap();
    fake.configure(&fake.call_to(&count)).unwrap()
        .does_nothing();
    assert_eq!(0, fake.call_as::<u32>(&count, values![]).unwrap());
}

#[test]
fn throwing_fallback() {
    let count = Member::method("Service", "count").returns::<u32>();
    let fake = Fake::dynamic("Service");
    fake.set_fallback(Fallback::Throw(Exception::msg("unexpected call")));
    let e = fake.call(&count, values![]).unwrap_err();
    assert_eq!("unexpected call", e.exception().unwrap().to_string());
    assert!(fake.recorded_calls()[0].threw());
}

#[test]
fn custom_fallback() {
    let token = Member::method("Service", "token")
        .param::<u64>("seed")
        .returns_without_default::<Token>();
    let fake = Fake::dynamic("Service");
    fake.set_fallback(Fallback::custom(|call| {
        let seed = *call.argument::<u64>(0).unwrap();
        Ok(Some(Value::new(Token(seed * 2))))
    }));
    assert_eq!(Token(42),
               fake.call_as::<Token>(&token, values![21u64]).unwrap());
}

#[test]
fn custom_fallback_of_the_wrong_type() {
    let count = Member::method("Service", "count").returns::<u32>();
    let fake = Fake::dynamic("Service");
    fake.set_fallback(Fallback::custom(|_| Ok(Some(Value::new(-1i8)))));
    let e = fake.call(&count, values![]).unwrap_err();
    assert!(matches!(e, DispatchError::ReturnTypeMismatch{..}));
    assert_eq!("Service::count produced a i8 where a u32 was expected",
               e.to_string());
}

#[test]
fn fallback_from_options() {
    let count = Member::method("Service", "count").returns::<u32>();
    let options = FakeOptions::for_interface("Service")
        .with_fallback(Fallback::Throw(Exception::msg("strict")));
    let fake = Fake::create(&DynamicProxyGenerator::new(), options).unwrap();
    assert!(fake.call(&count, values![]).is_err());
}
