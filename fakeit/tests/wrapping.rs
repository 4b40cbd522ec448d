// vim: tw=80
//! Class fakes that forward calls to the real implementation
#![deny(warnings)]

use fakeit::*;

fn area() -> Member {
    Member::method("Rect", "area").returns::<u32>()
}

fn scale() -> Member {
    Member::method("Rect", "scale")
        .param::<u32>("factor")
        .ref_param::<u32>("width")
        .returns::<u32>()
}

fn generator() -> DynamicProxyGenerator {
    DynamicProxyGenerator::new().with_class(
        ClassInfo::new("Rect")
            .with_constructors(vec![vec![], vec!["u32", "u32"]])
            .with_base(|member, args| match member.name() {
                "area" => Ok(Some(Value::new(12u32))),
                "scale" => {
                    let f = *args[0].downcast_ref::<u32>().unwrap();
                    let w = args[1].downcast_mut::<u32>().unwrap();
                    *w *= f;
                    Ok(Some(Value::new(*w)))
                },
                _ => Ok(None)
            }))
}

#[test]
fn wrapping_fake_calls_base_by_default() {
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect")
                                              .wrapping())
        .unwrap();
    assert_eq!(12, fake.call_as::<u32>(&area(), values![]).unwrap());
}

#[test]
fn rules_override_base() {
    let m = area();
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect")
                                              .wrapping())
        .unwrap();
    fake.configure(&fake.call_to(&m)).unwrap()
        .returns(1u32).unwrap()
        .once();
    assert_eq!(1, fake.call_as::<u32>(&m, values![]).unwrap());
    assert_eq!(12, fake.call_as::<u32>(&m, values![]).unwrap());
}

#[test]
fn calls_base_method() {
    let m = area();
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect"))
        .unwrap();
    assert_eq!(0, fake.call_as::<u32>(&m, values![]).unwrap());
    fake.configure(&fake.call_to(&m)).unwrap()
        .calls_base_method();
    assert_eq!(12, fake.call_as::<u32>(&m, values![]).unwrap());
}

#[test]
fn base_assigns_ref_params() {
    let m = scale();
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect")
                                              .wrapping())
        .unwrap();
    let mut args = values![3u32, 4u32];
    let r = fake.call_mut(&m, &mut args).unwrap().unwrap();
    assert_eq!(Some(&12u32), r.downcast_ref::<u32>());
    assert_eq!(Some(&12u32), args[1].downcast_ref::<u32>());
    assert_eq!(Some(&12u32), fake.recorded_calls()[0].argument::<u32>(1));
}

#[test]
fn rule_assignments_win_over_base() {
    let m = scale();
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect"))
        .unwrap();
    fake.configure(&fake.call_to(&m)).unwrap()
        .calls_base_method()
        .assigns_out_and_ref_parameters(values![100u32]).unwrap();
    let mut args = values![3u32, 4u32];
    let r = fake.call_mut(&m, &mut args).unwrap().unwrap();
    assert_eq!(Some(&12u32), r.downcast_ref::<u32>());
    assert_eq!(Some(&100u32), args[1].downcast_ref::<u32>());
}

#[test]
fn interface_has_no_base() {
    let m = area();
    let fake = Fake::dynamic("Shape");
    fake.configure(&fake.call_to(&m)).unwrap()
        .calls_base_method();
    let e = fake.call(&m, values![]).unwrap_err();
    assert!(matches!(e, DispatchError::NoBaseMethod{..}));
}

#[test]
fn constructor_arguments() {
    let fake = Fake::create(&generator(), FakeOptions::for_class("Rect")
        .with_constructor_arguments(values![3u32, 4u32]))
        .unwrap();
    assert_eq!(values![3u32, 4u32], fake.constructor_arguments().to_vec());
}
